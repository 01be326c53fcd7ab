//! Identifier naming utilities
//!
//! Pure functions used by the importers and emitters to convert schema
//! property names into field names and type names.

/// Words that end in "s" but are singular
const SINGULAR_S_WORDS: &[&str] = &[
    "status", "tls", "kerberos", "dns", "os", "ingress", "egress", "alias", "canvas", "https",
    "sds", "vs", "gis", "cors",
];

/// Prefixes rendered fully upper-case in derived type names
const ACRONYM_PREFIXES: &[&str] = &["tls", "ipam", "api"];

/// Reserved words of the emitted language; colliding field names get a
/// trailing underscore.
const RESERVED_WORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "crate",
    "do", "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl",
    "in", "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "self", "static", "struct", "super", "trait", "true", "try", "type", "typeof",
    "unsafe", "unsized", "use", "virtual", "where", "while", "yield",
];

/// Check whether `name` is a reserved word of the emitted language
pub fn is_reserved(name: &str) -> bool {
    RESERVED_WORDS.contains(&name)
}

/// Convert a camelCase or PascalCase identifier to snake_case
///
/// Runs of capitals followed by a pluralizing "s" stay together, a leading
/// `$` (JSON-Schema meta keys) and reserved words get a trailing underscore.
///
/// # Examples
/// ```
/// use kube_typegen_common::naming::camel_to_snake;
///
/// assert_eq!(camel_to_snake("targetWWNs"), "target_wwns");
/// assert_eq!(camel_to_snake("hostIPC"), "host_ipc");
/// assert_eq!(camel_to_snake("$ref"), "ref_");
/// ```
pub fn camel_to_snake(name: &str) -> String {
    let (body, meta) = match name.strip_prefix('$') {
        Some(rest) => (rest, true),
        None => (name, false),
    };

    let chars: Vec<char> = body.chars().collect();
    let mut result = String::with_capacity(body.len() + 4);

    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_ascii_uppercase() {
            if i > 0 && starts_new_word(&chars, i) && !result.ends_with('_') {
                result.push('_');
            }
            result.push(ch.to_ascii_lowercase());
        } else if ch.is_ascii_alphanumeric() {
            result.push(ch);
        } else if !result.is_empty() && !result.ends_with('_') {
            result.push('_');
        }
    }

    let mut result = result.trim_end_matches('_').to_string();
    if meta || is_reserved(&result) {
        result.push('_');
    }
    result
}

fn starts_new_word(chars: &[char], i: usize) -> bool {
    let prev = chars[i - 1];
    if prev.is_ascii_lowercase() || prev.is_ascii_digit() {
        return true;
    }
    if !prev.is_ascii_uppercase() {
        return false;
    }
    // Inside a run of capitals: split before the last capital only when a
    // real lowercase word follows, not a trailing plural "s".
    match chars.get(i + 1) {
        Some(next) if next.is_ascii_lowercase() => !is_plural_tail(chars, i + 1),
        _ => false,
    }
}

fn is_plural_tail(chars: &[char], j: usize) -> bool {
    chars[j] == 's'
        && chars
            .get(j + 1)
            .is_none_or(|c| !c.is_ascii_lowercase())
}

/// Derive a PascalCase type name for an anonymous object from the property
/// name it was declared under
///
/// # Examples
/// ```
/// use kube_typegen_common::naming::type_name_from_property_name;
///
/// assert_eq!(type_name_from_property_name("policies"), "Policy");
/// assert_eq!(type_name_from_property_name("tls"), "TLS");
/// assert_eq!(type_name_from_property_name("containers"), "Container");
/// ```
pub fn type_name_from_property_name(name: &str) -> String {
    let name = name.trim_start_matches('$');
    let segments: Vec<&str> = name
        .split(['-', '_', '.', '/'])
        .filter(|s| !s.is_empty())
        .collect();

    match segments.as_slice() {
        [] => String::new(),
        [single] => pascal_token(&singularize(single)),
        many => many
            .iter()
            .map(|segment| type_name_from_property_name(segment))
            .collect(),
    }
}

/// Strip a pluralizing suffix from a word, keeping its original casing
pub fn singularize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    let len = word.len();

    if SINGULAR_S_WORDS.contains(&lower.as_str()) || lower.ends_with("ss") || lower.ends_with("us")
    {
        return word.to_string();
    }
    if lower.ends_with("ies") && len > 3 {
        return format!("{}y", &word[..len - 3]);
    }
    if (lower.ends_with("sses") || lower.ends_with("xes")) && len > 3 {
        return word[..len - 2].to_string();
    }
    if lower.ends_with('s') && len > 1 {
        return word[..len - 1].to_string();
    }
    word.to_string()
}

fn pascal_token(word: &str) -> String {
    if word.len() <= 3 {
        return word.to_ascii_uppercase();
    }

    let lower = word.to_ascii_lowercase();
    if let Some(acronym) = ACRONYM_PREFIXES.iter().find(|a| lower.starts_with(*a)) {
        let rest = &word[acronym.len()..];
        return format!("{}{}", acronym.to_ascii_uppercase(), capitalize(rest));
    }

    capitalize(word)
}

/// Upper-case the first character of a string
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Sanitize a group name (e.g. `cert-manager.io`) into a module identifier
pub fn module_name(group: &str, version: Option<&str>) -> String {
    let base = match version {
        Some(version) => format!("{}_{}", group, version),
        None => group.to_string(),
    };
    let mut result = String::with_capacity(base.len());
    for ch in base.chars() {
        if ch.is_ascii_alphanumeric() {
            result.push(ch.to_ascii_lowercase());
        } else if !result.ends_with('_') {
            result.push('_');
        }
    }
    let result = result.trim_matches('_').to_string();
    if is_reserved(&result) {
        format!("{}_", result)
    } else {
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_camel_to_snake() {
        assert_eq!(camel_to_snake("targetWWNs"), "target_wwns");
        assert_eq!(camel_to_snake("hostIPC"), "host_ipc");
        assert_eq!(camel_to_snake("podIPs"), "pod_ips");
        assert_eq!(camel_to_snake("APIService"), "api_service");
        assert_eq!(camel_to_snake("ownerReferences"), "owner_references");
        assert_eq!(camel_to_snake("ipv4Address"), "ipv4_address");
        assert_eq!(camel_to_snake("x-kubernetes-list-type"), "x_kubernetes_list_type");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
    }

    #[test]
    fn test_camel_to_snake_meta_and_reserved() {
        assert_eq!(camel_to_snake("$ref"), "ref_");
        assert_eq!(camel_to_snake("$schema"), "schema_");
        assert_eq!(camel_to_snake("type"), "type_");
        assert_eq!(camel_to_snake("continue"), "continue_");
        assert_eq!(camel_to_snake("kind"), "kind");
    }

    #[test]
    fn test_type_name_from_property_name() {
        assert_eq!(type_name_from_property_name("policies"), "Policy");
        assert_eq!(type_name_from_property_name("tls"), "TLS");
        assert_eq!(type_name_from_property_name("status"), "Status");
        assert_eq!(type_name_from_property_name("kerberos"), "Kerberos");
        assert_eq!(type_name_from_property_name("spec"), "Spec");
        assert_eq!(type_name_from_property_name("matchExpressions"), "MatchExpression");
        assert_eq!(type_name_from_property_name("hostIPs"), "HostIP");
        assert_eq!(type_name_from_property_name("ips"), "IP");
    }

    #[test]
    fn test_type_name_acronyms() {
        assert_eq!(type_name_from_property_name("tlsConfig"), "TLSConfig");
        assert_eq!(type_name_from_property_name("ipamConfig"), "IPAMConfig");
        assert_eq!(type_name_from_property_name("apiGroups"), "APIGroup");
        assert_eq!(type_name_from_property_name("env"), "ENV");
    }

    #[test]
    fn test_type_name_hyphenated() {
        assert_eq!(type_name_from_property_name("prometheus-rules"), "PrometheusRule");
        assert_eq!(type_name_from_property_name("node-tls"), "NodeTLS");
        assert_eq!(type_name_from_property_name("$schema"), "Schema");
    }

    #[test]
    fn test_singularize() {
        assert_eq!(singularize("addresses"), "address");
        assert_eq!(singularize("prefixes"), "prefix");
        assert_eq!(singularize("ingress"), "ingress");
        assert_eq!(singularize("entries"), "entry");
        assert_eq!(singularize("rule"), "rule");
    }

    #[test]
    fn test_module_name() {
        assert_eq!(module_name("apps", Some("v1")), "apps_v1");
        assert_eq!(module_name("cert-manager.io", None), "cert_manager_io");
        assert_eq!(module_name("", Some("v1")), "v1");
    }
}

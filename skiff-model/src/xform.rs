/*
 * Copyright Skiff Contributors. All Rights Reserved.
 * SPDX-License-Identifier: Apache-2.0
 */

/// Converts a declared name like `DescribeWidgets` to its caller-facing
/// `describe_widgets` form.
///
/// Acronym runs collapse: `DescribeDBInstances` becomes
/// `describe_db_instances`. Names that are already snake_case pass through
/// unchanged, so lookups accept either spelling.
pub fn xform_name(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);
    for (i, c) in chars.iter().enumerate() {
        if c.is_ascii_uppercase() {
            let prev_lower = i > 0 && chars[i - 1].is_ascii_lowercase();
            let next_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            let prev_upper = i > 0 && chars[i - 1].is_ascii_uppercase();
            if prev_lower || (prev_upper && next_lower) {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
        } else {
            out.push(*c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::xform_name;

    #[test]
    fn camel_case_becomes_snake_case() {
        assert_eq!(xform_name("DescribeWidgets"), "describe_widgets");
        assert_eq!(xform_name("CreateEnvironment"), "create_environment");
    }

    #[test]
    fn acronym_runs_collapse() {
        assert_eq!(xform_name("DescribeDBInstances"), "describe_db_instances");
        assert_eq!(xform_name("ImportKeyPair"), "import_key_pair");
    }

    #[test]
    fn snake_case_passes_through() {
        assert_eq!(xform_name("describe_widgets"), "describe_widgets");
    }
}

// SPDX-FileCopyrightText: 2026 Chaser Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Placeholder substitution for followup subjects and bodies.
//!
//! Content is otherwise opaque text; only the two documented placeholders
//! are interpreted. Unknown placeholders pass through untouched.

const CLIENT_NAME: &str = "{{client_name}}";
const BUSINESS_NAME: &str = "{{business_name}}";

/// Substitute `{{client_name}}` and `{{business_name}}` in a template.
pub fn render(template: &str, client_name: &str, business_name: &str) -> String {
    template
        .replace(CLIENT_NAME, client_name)
        .replace(BUSINESS_NAME, business_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_both_placeholders() {
        let out = render(
            "Hi {{client_name}}, {{business_name}} here about your invoice.",
            "Ada",
            "Acme",
        );
        assert_eq!(out, "Hi Ada, Acme here about your invoice.");
    }

    #[test]
    fn repeated_placeholders_are_all_replaced() {
        let out = render("{{client_name}} {{client_name}}", "Ada", "Acme");
        assert_eq!(out, "Ada Ada");
    }

    #[test]
    fn unknown_placeholders_pass_through() {
        let out = render("Hello {{invoice_total}}", "Ada", "Acme");
        assert_eq!(out, "Hello {{invoice_total}}");
    }
}

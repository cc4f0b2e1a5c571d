use std::collections::HashMap;

/// Fills `{key}` placeholders in a static template.
pub struct MessageBuilder {
    template: &'static str,
    vars: HashMap<&'static str, String>,
}

impl MessageBuilder {
    pub fn new(template: &'static str) -> Self {
        Self {
            template,
            vars: HashMap::new(),
        }
    }

    pub fn var(mut self, key: &'static str, value: impl ToString) -> Self {
        self.vars.insert(key, value.to_string());
        self
    }

    pub fn build(self) -> String {
        let mut result = self.template.to_string();
        for (key, value) in self.vars {
            result = result.replace(&format!("{{{key}}}"), &value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::msg;

    #[test]
    fn test_builder_replaces_every_occurrence() {
        let text = MessageBuilder::new("{vm} then {vm} and {count}")
            .var("vm", "web01")
            .var("count", 3)
            .build();
        assert_eq!(text, "web01 then web01 and 3");
    }

    #[test]
    fn test_unknown_placeholders_are_left_alone() {
        let text = msg!("{known} {unknown}", known = "x");
        assert_eq!(text, "x {unknown}");
    }

    #[test]
    fn test_template_without_vars() {
        assert_eq!(msg!("plain"), "plain");
    }
}

//! Canonical template diff.
//!
//! Both templates are parsed (JSON or YAML), normalized, and serialized with
//! sorted keys and two-space indentation before a line diff is computed, so
//! reordering in the provider's serialization never shows up as a change.
//! YAML short-form intrinsics (`!Ref`, `!GetAtt`, `!Sub`, ...) are expanded to
//! their long form, which makes a YAML template and its JSON equivalent
//! compare equal.

use serde::Serialize;
use serde_json::{Map, Value};
use similar::{ChangeTag, TextDiff};

use crate::error::{ChangeSetError, Result};

/// Kind of a diff line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LineChange {
    /// Present in both templates.
    Context,
    /// Present only in the deployed template.
    Removed,
    /// Present only in the candidate template.
    Added,
}

/// One line of a template diff.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffLine {
    /// Line kind.
    pub change: LineChange,
    /// Line text without trailing newline.
    pub text: String,
}

/// Line diff between the deployed and the candidate template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateDiff {
    /// All lines in order.
    pub lines: Vec<DiffLine>,
    /// Canonical deployed template.
    #[serde(skip)]
    deployed: String,
    /// Canonical candidate template.
    #[serde(skip)]
    candidate: String,
}

impl TemplateDiff {
    /// Computes the diff between two template bodies.
    ///
    /// # Errors
    ///
    /// Returns [`ChangeSetError::Template`] if either body is neither JSON
    /// nor YAML.
    pub fn compute(deployed: &str, candidate: &str) -> Result<Self> {
        let deployed = canonicalize(deployed).map_err(|message| ChangeSetError::Template {
            which: "deployed",
            message,
        })?;
        let candidate = canonicalize(candidate).map_err(|message| ChangeSetError::Template {
            which: "candidate",
            message,
        })?;

        let lines = TextDiff::from_lines(&deployed, &candidate)
            .iter_all_changes()
            .map(|change| DiffLine {
                change: match change.tag() {
                    ChangeTag::Equal => LineChange::Context,
                    ChangeTag::Delete => LineChange::Removed,
                    ChangeTag::Insert => LineChange::Added,
                },
                text: change.value().trim_end_matches('\n').to_string(),
            })
            .collect();

        Ok(Self {
            lines,
            deployed,
            candidate,
        })
    }

    /// Number of added or removed lines.
    #[must_use]
    pub fn change_count(&self) -> usize {
        self.lines
            .iter()
            .filter(|line| line.change != LineChange::Context)
            .count()
    }

    /// Returns true if the templates are equivalent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.change_count() == 0
    }

    /// Renders a unified diff with the given number of context lines.
    #[must_use]
    pub fn unified(&self, context: usize) -> String {
        TextDiff::from_lines(&self.deployed, &self.candidate)
            .unified_diff()
            .context_radius(context)
            .header("deployed", "candidate")
            .to_string()
    }
}

/// Serializes a template body canonically.
///
/// # Errors
///
/// Returns the parser message if the body is neither JSON nor YAML.
pub fn canonicalize(template: &str) -> std::result::Result<String, String> {
    if template.trim().is_empty() {
        return Ok(String::new());
    }

    let value = match serde_json::from_str::<Value>(template) {
        Ok(value) => value,
        Err(_) => serde_yaml::from_str::<serde_yaml::Value>(template)
            .map(yaml_to_json)
            .map_err(|e| e.to_string())?,
    };

    let mut text = serde_json::to_string_pretty(&sort_keys(value)).map_err(|e| e.to_string())?;
    text.push('\n');
    Ok(text)
}

/// Rebuilds every object with its keys in sorted order.
fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(String, Value)> = map.into_iter().collect();
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
            Value::Object(
                entries
                    .into_iter()
                    .map(|(key, value)| (key, sort_keys(value)))
                    .collect::<Map<String, Value>>(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::from(i)
            } else if let Some(u) = n.as_u64() {
                Value::from(u)
            } else {
                n.as_f64()
                    .and_then(serde_json::Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => {
            Value::Array(items.into_iter().map(yaml_to_json).collect())
        }
        serde_yaml::Value::Mapping(mapping) => Value::Object(
            mapping
                .into_iter()
                .map(|(key, value)| (yaml_key(key), yaml_to_json(value)))
                .collect(),
        ),
        serde_yaml::Value::Tagged(tagged) => {
            let serde_yaml::value::TaggedValue { tag, value } = *tagged;
            let name = tag.to_string();
            let name = name.trim_start_matches('!');
            let intrinsic = match name {
                "Ref" | "Condition" => name.to_string(),
                _ => format!("Fn::{name}"),
            };

            let value = match (intrinsic.as_str(), yaml_to_json(value)) {
                ("Fn::GetAtt", Value::String(s)) => match s.split_once('.') {
                    Some((resource, attribute)) => Value::Array(vec![
                        Value::String(resource.to_string()),
                        Value::String(attribute.to_string()),
                    ]),
                    None => Value::String(s),
                },
                (_, value) => value,
            };

            let mut map = Map::new();
            map.insert(intrinsic, value);
            Value::Object(map)
        }
    }
}

fn yaml_key(key: serde_yaml::Value) -> String {
    match key {
        serde_yaml::Value::String(s) => s,
        other => serde_yaml::to_string(&other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reordered_json_has_no_changes() {
        let deployed = r#"{"Resources": {"B": {"Type": "AWS::S3::Bucket"}, "A": {"Type": "AWS::Lambda::Function", "Properties": {"Runtime": "python3.12", "Handler": "app.handler"}}}}"#;
        let candidate = r#"{"Resources": {"A": {"Properties": {"Handler": "app.handler", "Runtime": "python3.12"}, "Type": "AWS::Lambda::Function"}, "B": {"Type": "AWS::S3::Bucket"}}}"#;

        let diff = TemplateDiff::compute(deployed, candidate).expect("diff");
        assert!(diff.is_empty());
        assert!(diff.lines.iter().all(|l| l.change == LineChange::Context));
    }

    #[test]
    fn test_yaml_short_form_matches_json_long_form() {
        let yaml = r"
Resources:
  Fn:
    Type: AWS::Lambda::Function
    Properties:
      Role: !GetAtt Role.Arn
      Environment:
        Variables:
          BUCKET: !Ref Bucket
";
        let json = r#"{"Resources": {"Fn": {"Type": "AWS::Lambda::Function", "Properties": {
            "Environment": {"Variables": {"BUCKET": {"Ref": "Bucket"}}},
            "Role": {"Fn::GetAtt": ["Role", "Arn"]}}}}}"#;

        let diff = TemplateDiff::compute(json, yaml).expect("diff");
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn test_condition_short_form_has_no_fn_prefix() {
        let yaml = r"
Conditions:
  IsProd: !Equals [!Ref Stage, prod]
  CreateAlarm: !And [!Condition IsProd, !Not [!Equals [!Ref Alarms, none]]]
";
        let json = r#"{"Conditions": {
            "IsProd": {"Fn::Equals": [{"Ref": "Stage"}, "prod"]},
            "CreateAlarm": {"Fn::And": [{"Condition": "IsProd"}, {"Fn::Not": [{"Fn::Equals": [{"Ref": "Alarms"}, "none"]}]}]}}}"#;

        let diff = TemplateDiff::compute(json, yaml).expect("diff");
        assert_eq!(diff.change_count(), 0);
    }

    #[test]
    fn test_changed_property_is_reported_as_removed_and_added() {
        let deployed = r#"{"Resources": {"A": {"Properties": {"MemorySize": 128}}}}"#;
        let candidate = r#"{"Resources": {"A": {"Properties": {"MemorySize": 256}}}}"#;

        let diff = TemplateDiff::compute(deployed, candidate).expect("diff");
        assert_eq!(diff.change_count(), 2);

        let removed: Vec<&str> = diff
            .lines
            .iter()
            .filter(|l| l.change == LineChange::Removed)
            .map(|l| l.text.trim())
            .collect();
        let added: Vec<&str> = diff
            .lines
            .iter()
            .filter(|l| l.change == LineChange::Added)
            .map(|l| l.text.trim())
            .collect();
        assert_eq!(removed, vec![r#""MemorySize": 128"#]);
        assert_eq!(added, vec![r#""MemorySize": 256"#]);
    }

    #[test]
    fn test_canonical_form_uses_sorted_keys_and_two_spaces() {
        let canonical = canonicalize(r#"{"b": 1, "a": {"d": 2, "c": 3}}"#).expect("canonical");
        assert_eq!(
            canonical,
            "{\n  \"a\": {\n    \"c\": 3,\n    \"d\": 2\n  },\n  \"b\": 1\n}\n"
        );
    }

    #[test]
    fn test_unified_output_has_headers() {
        let diff = TemplateDiff::compute(r#"{"a": 1}"#, r#"{"a": 2}"#).expect("diff");
        let unified = diff.unified(3);
        assert!(unified.contains("--- deployed"));
        assert!(unified.contains("+++ candidate"));
        assert!(unified.contains("-  \"a\": 1"));
        assert!(unified.contains("+  \"a\": 2"));
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let err = TemplateDiff::compute("{}", "key: [unclosed").expect_err("invalid");
        assert!(err.to_string().contains("candidate"));
    }
}

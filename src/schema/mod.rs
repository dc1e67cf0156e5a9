//! Declarative shape checks over parsed JSON. No coercion happens here; the
//! normalizer coerces first and this module only says yes or no.

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    Number,
    String,
    StringArray,
    /// Every listed field is required. Extra keys are allowed.
    Object(Vec<Field>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub shape: Shape,
}

fn field(name: &'static str, shape: Shape) -> Field {
    Field { name, shape }
}

pub fn audit_schema() -> Shape {
    Shape::Object(vec![
        field("score", Shape::Number),
        field(
            "breakdown",
            Shape::Object(vec![
                field("clarity", Shape::Number),
                field("context", Shape::Number),
                field("constraints", Shape::Number),
            ]),
        ),
        field("issues", Shape::StringArray),
        field("suggestions", Shape::StringArray),
    ])
}

pub fn enhancer_schema() -> Shape {
    Shape::Object(vec![
        field("logical", Shape::String),
        field("creative", Shape::String),
        field("optimized", Shape::String),
    ])
}

pub fn questions_schema() -> Shape {
    Shape::Object(vec![field("questions", Shape::StringArray)])
}

pub fn validate(schema: &Shape, data: &Value) -> bool {
    check(schema, data).is_ok()
}

/// Like [`validate`], but names the first offending path.
pub fn check(schema: &Shape, data: &Value) -> Result<(), String> {
    check_at("$", schema, data)
}

fn check_at(path: &str, schema: &Shape, data: &Value) -> Result<(), String> {
    match schema {
        Shape::Number if data.is_number() => Ok(()),
        Shape::String if data.is_string() => Ok(()),
        Shape::StringArray => match data.as_array() {
            Some(items) => match items.iter().position(|v| !v.is_string()) {
                None => Ok(()),
                Some(i) => Err(format!("{path}[{i}]: expected string")),
            },
            None => Err(format!("{path}: expected array of strings")),
        },
        Shape::Object(fields) => {
            let obj = data
                .as_object()
                .ok_or_else(|| format!("{path}: expected object"))?;
            for f in fields {
                let child = format!("{path}.{}", f.name);
                let v = obj
                    .get(f.name)
                    .ok_or_else(|| format!("{child}: missing required key"))?;
                check_at(&child, &f.shape, v)?;
            }
            Ok(())
        }
        Shape::Number => Err(format!("{path}: expected number")),
        Shape::String => Err(format!("{path}: expected string")),
    }
}

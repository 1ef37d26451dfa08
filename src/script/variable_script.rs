use std::fmt;
use std::fs;
use std::path::Path;

use glam::{Vec3, Vec4};
use log::warn;

use super::{ScriptError, Value, SCRIPT_EXTENSION};

/// Named script value.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub value: Value,
}

/// Ordered set of uniquely named variables.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct VariableScript {
    variables: Vec<Variable>,
}

impl VariableScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads a `.var` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        check_extension(path)?;
        let text = fs::read_to_string(path).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Writes the script to a `.var` file.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ScriptError> {
        let path = path.as_ref();
        check_extension(path)?;
        fs::write(path, self.to_string()).map_err(|source| ScriptError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses the first `#begin` ... `#end` block of `text`.
    ///
    /// Anything outside the block is ignored, as are blank lines inside it.
    pub fn parse(text: &str) -> Result<Self, ScriptError> {
        let mut script = Self::new();
        let mut lines = text.lines().enumerate().map(|(i, line)| (i + 1, line.trim()));
        let Some((begin, _)) = lines.by_ref().find(|(_, line)| *line == "#begin") else {
            return Ok(script);
        };
        for (number, line) in lines {
            if line == "#end" {
                return Ok(script);
            }
            if line.is_empty() {
                continue;
            }
            let (name, value) = parse_line(line).map_err(|message| ScriptError::Malformed {
                line: number,
                message,
            })?;
            script.set(name, value);
        }
        Err(ScriptError::UnterminatedBlock(begin))
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.variables
            .iter()
            .find(|variable| variable.name == name)
            .map(|variable| &variable.value)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Sets `name`, replacing an existing value in place.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.variables.iter_mut().find(|variable| variable.name == name) {
            Some(variable) => variable.value = value,
            None => self.variables.push(Variable { name, value }),
        }
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let index = self
            .variables
            .iter()
            .position(|variable| variable.name == name)?;
        Some(self.variables.remove(index).value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn len(&self) -> usize {
        self.variables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }
}

impl fmt::Display for VariableScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "#begin")?;
        for variable in &self.variables {
            writeln!(
                f,
                "{} {} {}",
                variable.name,
                variable.value.type_name(),
                variable.value
            )?;
        }
        writeln!(f, "#end")
    }
}

fn check_extension(path: &Path) -> Result<(), ScriptError> {
    let supported = path
        .extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case(SCRIPT_EXTENSION));
    if supported {
        Ok(())
    } else {
        Err(ScriptError::UnsupportedExtension(path.to_path_buf()))
    }
}

fn parse_line(line: &str) -> Result<(String, Value), String> {
    let (name, rest) = split_token(line);
    let (type_name, payload) = split_token(rest);
    if type_name.is_empty() {
        return Err(format!("variable {name} has no type"));
    }
    let value = match type_name {
        "bool" => match payload {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            other => return Err(format!("invalid bool {other:?}")),
        },
        "int" => Value::Int(
            payload
                .parse()
                .map_err(|err| format!("invalid int {payload:?}: {err}"))?,
        ),
        "float" => Value::Float(
            payload
                .parse()
                .map_err(|err| format!("invalid float {payload:?}: {err}"))?,
        ),
        "float3" => Value::Float3(Vec3::from_array(parse_floats(payload)?)),
        "float4" => Value::Float4(Vec4::from_array(parse_floats(payload)?)),
        "color" | "colour" => Value::Color(Vec4::from_array(parse_floats(payload)?)),
        "string" => Value::String(parse_quoted(payload)?),
        other => {
            warn!("variable {name} has unknown type {other:?}; keeping it verbatim");
            Value::Unknown(payload.to_string())
        }
    };
    Ok((name.to_string(), value))
}

fn split_token(text: &str) -> (&str, &str) {
    match text.split_once(char::is_whitespace) {
        Some((token, rest)) => (token, rest.trim_start()),
        None => (text, ""),
    }
}

fn parse_floats<const N: usize>(payload: &str) -> Result<[f32; N], String> {
    let mut values = [0.0; N];
    let mut components = payload.split_whitespace();
    for value in values.iter_mut() {
        let component = components
            .next()
            .ok_or_else(|| format!("expected {N} components in {payload:?}"))?;
        *value = component
            .parse()
            .map_err(|err| format!("invalid float {component:?}: {err}"))?;
    }
    if components.next().is_some() {
        return Err(format!("expected {N} components in {payload:?}"));
    }
    Ok(values)
}

fn parse_quoted(payload: &str) -> Result<String, String> {
    payload
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .map(str::to_string)
        .ok_or_else(|| format!("string {payload:?} is not quoted"))
}

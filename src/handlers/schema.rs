//! GraphQL operation model and the execution seam behind the GraphQL strategy.
//!
//! # Responsibilities
//! - Describe an extracted operation (document, variables, name, kind)
//! - Classify operations lexically (introspection, mutation, subscription, query)
//! - Define the wire shapes `{data}` / `{errors: [{message, extensions: {code}}]}`
//! - Provide `SampleSchema`, a stand-in resolver set
//!
//! # Design Decisions
//! - No full GraphQL parser: root selections are found by a brace-depth scan
//! - Application errors travel inside `ExecutionResult`, not as `Err`
//! - `ExecutorError` is reserved for faults of the executor itself

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{json, Map, Value};
use uuid::Uuid;

static INTROSPECTION_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b__(schema|type)\b").expect("introspection pattern is valid"));

/// Kind of a GraphQL operation, decided lexically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
    Introspection,
}

impl OperationKind {
    /// `__schema` / `__type` tokens win, then the leading keyword decides.
    pub fn detect(document: &str) -> Self {
        if INTROSPECTION_TOKEN.is_match(document) {
            return OperationKind::Introspection;
        }

        let trimmed = document.trim_start();
        if trimmed.starts_with("mutation") {
            OperationKind::Mutation
        } else if trimmed.starts_with("subscription") {
            OperationKind::Subscription
        } else {
            OperationKind::Query
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Query => "query",
            OperationKind::Mutation => "mutation",
            OperationKind::Subscription => "subscription",
            OperationKind::Introspection => "introspection",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An operation extracted from a request.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub document: String,
    pub variables: Map<String, Value>,
    pub operation_name: Option<String>,
    pub kind: OperationKind,
}

impl Operation {
    pub fn new(document: impl Into<String>, variables: Map<String, Value>, operation_name: Option<String>) -> Self {
        let document = document.into();
        let kind = OperationKind::detect(&document);
        Self {
            document,
            variables,
            operation_name,
            kind,
        }
    }
}

/// `extensions` of an error object. Always carries `code`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorExtensions {
    pub code: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A GraphQL error object: `{message, extensions: {code, ...}}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorObject {
    pub message: String,
    pub extensions: ErrorExtensions,
}

impl ErrorObject {
    pub fn new(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            extensions: ErrorExtensions {
                code: code.into(),
                extra: Map::new(),
            },
        }
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.extensions.extra.insert(key.into(), value.into());
        self
    }
}

/// Outcome of an operation: `{data}`, `{errors}` or both.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct ExecutionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ErrorObject>,
}

impl ExecutionResult {
    pub fn data(data: Value) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
        }
    }

    pub fn error(error: ErrorObject) -> Self {
        Self {
            data: None,
            errors: vec![error],
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("resolver for `{field}` failed: {reason}")]
    Resolver { field: String, reason: String },
    #[error("schema unavailable: {0}")]
    Unavailable(String),
}

/// Executes GraphQL operations against a schema.
pub trait GraphqlExecutor: Send + Sync + fmt::Debug {
    fn execute(&self, operation: &Operation) -> Result<ExecutionResult, ExecutorError>;
}

/// A root-level selection: `alias: name(args) { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub alias: String,
    pub name: String,
    pub arguments: String,
}

/// Root selections of the first selection set in `document`.
pub fn root_selections(document: &str) -> Vec<Selection> {
    let chars: Vec<char> = document.chars().collect();
    let Some(open) = chars.iter().position(|c| *c == '{') else {
        return Vec::new();
    };

    let mut selections = Vec::new();
    let mut i = open + 1;
    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == ',' {
            i += 1;
            continue;
        }
        if c == '}' {
            break;
        }
        if !is_name_char(c) {
            i += 1;
            continue;
        }

        let first = read_name(&chars, &mut i);
        skip_whitespace(&chars, &mut i);
        let (alias, name) = if chars.get(i) == Some(&':') {
            i += 1;
            skip_whitespace(&chars, &mut i);
            let name = read_name(&chars, &mut i);
            (first, name)
        } else {
            (first.clone(), first)
        };
        skip_whitespace(&chars, &mut i);

        let mut arguments = String::new();
        if chars.get(i) == Some(&'(') {
            let end = matching(&chars, i, '(', ')');
            arguments = chars[i + 1..end.min(chars.len())].iter().collect();
            i = end + 1;
            skip_whitespace(&chars, &mut i);
        }
        if chars.get(i) == Some(&'{') {
            i = matching(&chars, i, '{', '}') + 1;
        }

        if !name.is_empty() {
            selections.push(Selection {
                alias,
                name,
                arguments,
            });
        }
    }
    selections
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn read_name(chars: &[char], i: &mut usize) -> String {
    let start = *i;
    while *i < chars.len() && is_name_char(chars[*i]) {
        *i += 1;
    }
    chars[start..*i].iter().collect()
}

fn skip_whitespace(chars: &[char], i: &mut usize) {
    while *i < chars.len() && chars[*i].is_whitespace() {
        *i += 1;
    }
}

/// Index of the bracket closing the one at `start`, or `chars.len()`.
fn matching(chars: &[char], start: usize, open: char, close: char) -> usize {
    let mut depth = 0usize;
    for (offset, c) in chars[start..].iter().enumerate() {
        if *c == open {
            depth += 1;
        } else if *c == close {
            depth -= 1;
            if depth == 0 {
                return start + offset;
            }
        }
    }
    chars.len()
}

/// Stand-in schema with a handful of sample resolvers.
///
/// Query: `hello`, `users`, `user(id:)`, `__typename`.
/// Mutation: `createUser(input:)`, `updateUser(id:, input:)`, `deleteUser(id:)`.
/// Introspection: `__schema`, `__type(name:)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SampleSchema;

impl SampleSchema {
    fn users() -> Value {
        json!([
            {"id": 1, "name": "Ada Lovelace", "email": "ada@example.com"},
            {"id": 2, "name": "Alan Turing", "email": "alan@example.com"},
        ])
    }

    fn schema() -> Value {
        json!({
            "queryType": {"name": "Query"},
            "mutationType": {"name": "Mutation"},
            "subscriptionType": null,
            "types": [
                Self::type_description("Query"),
                Self::type_description("Mutation"),
                Self::type_description("User"),
            ],
        })
    }

    fn type_description(name: &str) -> Value {
        let fields: &[&str] = match name {
            "Query" => &["hello", "users", "user"],
            "Mutation" => &["createUser", "updateUser", "deleteUser"],
            "User" => &["id", "name", "email"],
            _ => return Value::Null,
        };
        json!({
            "name": name,
            "kind": "OBJECT",
            "fields": fields.iter().map(|f| json!({"name": f})).collect::<Vec<_>>(),
        })
    }

    /// Value of argument `key`, from the inline arguments or a `$variable`.
    fn argument(selection: &Selection, key: &str, variables: &Map<String, Value>) -> Option<Value> {
        let pattern = format!(r#"\b{key}\s*:\s*(\$\w+|"[^"]*"|-?\d+)"#);
        let re = Regex::new(&pattern).ok()?;
        let raw = re.captures(&selection.arguments)?.get(1)?.as_str();
        if let Some(variable) = raw.strip_prefix('$') {
            return variables.get(variable).cloned();
        }
        if let Some(text) = raw.strip_prefix('"').and_then(|r| r.strip_suffix('"')) {
            return Some(Value::String(text.to_string()));
        }
        raw.parse::<i64>().ok().map(Value::from)
    }

    fn resolve(
        &self,
        root: &str,
        selection: &Selection,
        variables: &Map<String, Value>,
    ) -> Result<Value, ErrorObject> {
        match (root, selection.name.as_str()) {
            (_, "__typename") => Ok(Value::String(root.to_string())),
            ("Query", "__schema") => Ok(Self::schema()),
            ("Query", "__type") => {
                let name = Self::argument(selection, "name", variables);
                Ok(name
                    .as_ref()
                    .and_then(Value::as_str)
                    .map(Self::type_description)
                    .unwrap_or(Value::Null))
            }
            ("Query", "hello") => Ok(json!("Hello from GraphQL")),
            ("Query", "users") => Ok(Self::users()),
            ("Query", "user") => {
                let id = Self::argument(selection, "id", variables)
                    .and_then(|v| v.as_i64().or_else(|| v.as_str()?.parse().ok()))
                    .ok_or_else(|| {
                        ErrorObject::new("Argument \"id\" of field \"user\" is required", "BAD_USER_INPUT")
                    })?;
                Ok(Self::users()
                    .as_array()
                    .and_then(|users| users.iter().find(|u| u["id"] == id).cloned())
                    .unwrap_or(Value::Null))
            }
            ("Mutation", "createUser") => {
                let mut user = Self::input(selection, variables);
                user.insert("id".into(), Value::String(Uuid::new_v4().to_string()));
                Ok(Value::Object(user))
            }
            ("Mutation", "updateUser") => {
                let id = Self::argument(selection, "id", variables).ok_or_else(|| {
                    ErrorObject::new("Argument \"id\" of field \"updateUser\" is required", "BAD_USER_INPUT")
                })?;
                let mut user = Self::input(selection, variables);
                user.insert("id".into(), id);
                Ok(Value::Object(user))
            }
            ("Mutation", "deleteUser") => Ok(Value::Bool(
                Self::argument(selection, "id", variables).is_some(),
            )),
            (root, field) => Err(ErrorObject::new(
                format!("Cannot query field \"{field}\" on type \"{root}\"."),
                "GRAPHQL_VALIDATION_FAILED",
            )),
        }
    }

    fn input(selection: &Selection, variables: &Map<String, Value>) -> Map<String, Value> {
        match Self::argument(selection, "input", variables) {
            Some(Value::Object(input)) => input,
            _ => Map::new(),
        }
    }
}

impl GraphqlExecutor for SampleSchema {
    fn execute(&self, operation: &Operation) -> Result<ExecutionResult, ExecutorError> {
        let root = match operation.kind {
            OperationKind::Mutation => "Mutation",
            OperationKind::Query | OperationKind::Introspection => "Query",
            OperationKind::Subscription => {
                return Err(ExecutorError::Unavailable(
                    "subscriptions have no resolvers".to_string(),
                ))
            }
        };

        let selections = root_selections(&operation.document);
        if selections.is_empty() {
            return Ok(ExecutionResult::error(ErrorObject::new(
                "Syntax Error: expected a selection set",
                "GRAPHQL_PARSE_FAILED",
            )));
        }

        let mut data = Map::new();
        let mut errors = Vec::new();
        for selection in &selections {
            match self.resolve(root, selection, &operation.variables) {
                Ok(value) => {
                    data.insert(selection.alias.clone(), value);
                }
                Err(error) if error.extensions.code == "GRAPHQL_VALIDATION_FAILED" => {
                    return Ok(ExecutionResult::error(error));
                }
                Err(error) => {
                    data.insert(selection.alias.clone(), Value::Null);
                    errors.push(error);
                }
            }
        }

        Ok(ExecutionResult {
            data: Some(Value::Object(data)),
            errors,
        })
    }
}

//! Template variables.
//!
//! Contract templates carry their fill-in fields two ways: as `${name}`
//! placeholders inside text, and as elements bound by a `data-variable`
//! attribute whose whole text is the value. This module finds them and
//! fills them in on the plain document tree, before pagination. Editing
//! values on an already paginated document goes through
//! [`PageSet::apply_variables`](crate::PageSet::apply_variables).

use std::collections::{BTreeMap, HashSet};
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;

use crate::model::{Node, VARIABLE_ATTRIBUTE};

/// `${name}`, with optional spaces inside the braces. Names are letters
/// (Latin or Cyrillic), digits and underscores.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{\s*([a-zA-Zа-яА-ЯёЁ0-9_]+)\s*\}").expect("placeholder pattern is valid")
});

/// A fill-in field found in a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Variable {
    /// The bare name, e.g. `contract_date`.
    pub name: String,
    /// The text as it first appeared, e.g. `${ contract_date }`.
    pub placeholder: String,
    /// `Contract Date`.
    pub human_name: String,
    #[serde(rename = "type")]
    pub kind: VariableType,
}

/// The kind of value a variable probably expects, guessed from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableType {
    Date,
    Money,
    Number,
    Array,
    Text,
}

impl VariableType {
    pub fn detect(name: &str) -> Self {
        let lower = name.to_lowercase();
        let has = |needle: &str| lower.contains(needle);
        if has("date") {
            VariableType::Date
        } else if has("amount") || has("price") {
            VariableType::Money
        } else if has("quantity") || has("number") {
            VariableType::Number
        } else if has("list") || has("items") {
            VariableType::Array
        } else {
            VariableType::Text
        }
    }
}

impl Variable {
    fn new(name: &str, placeholder: &str) -> Self {
        Self {
            name: name.to_string(),
            placeholder: placeholder.to_string(),
            human_name: human_name(name),
            kind: VariableType::detect(name),
        }
    }
}

/// `party_one_NAME` -> `Party One Name`.
pub fn human_name(name: &str) -> String {
    name.split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let lower = word.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Every variable in the tree, each name once, in document order.
pub fn extract_variables(root: &Node) -> Vec<Variable> {
    // Placeholders may straddle text-run boundaries in the raw tree.
    let mut tree = root.clone();
    tree.normalize();

    let mut seen = HashSet::new();
    let mut found = Vec::new();
    tree.walk(&mut |node| {
        if let Some(name) = node.attributes.get(VARIABLE_ATTRIBUTE) {
            if seen.insert(name.clone()) {
                found.push(Variable::new(name, &format!("${{{name}}}")));
            }
        }
        if let Some(text) = &node.text {
            for caps in PLACEHOLDER.captures_iter(text) {
                let name = &caps[1];
                if seen.insert(name.to_string()) {
                    found.push(Variable::new(name, &caps[0]));
                }
            }
        }
    });
    found
}

/// Fill in `values`: placeholders in text are replaced in place, and bound
/// elements get their children replaced by a single run holding the value.
/// Names with no value are left as they are.
pub fn substitute(root: &Node, values: &BTreeMap<String, String>) -> Node {
    let mut tree = root.clone();
    tree.normalize();
    fill(&mut tree, values);
    tree.normalize();
    tree
}

fn fill(node: &mut Node, values: &BTreeMap<String, String>) {
    if let Some(value) = node
        .attributes
        .get(VARIABLE_ATTRIBUTE)
        .and_then(|name| values.get(name))
    {
        node.children = vec![Node::text(value)];
        return;
    }
    if let Some(text) = &mut node.text {
        if PLACEHOLDER.is_match(text) {
            let replaced = PLACEHOLDER
                .replace_all(text, |caps: &Captures<'_>| {
                    values
                        .get(&caps[1])
                        .cloned()
                        .unwrap_or_else(|| caps[0].to_string())
                })
                .into_owned();
            *text = replaced;
        }
    }
    for child in &mut node.children {
        fill(child, values);
    }
}

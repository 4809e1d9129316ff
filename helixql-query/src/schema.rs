//! Schema registry: node and edge type definitions resolved from
//! `NODE` / `EDGE` declarations.
//!
//! Node and edge types share one namespace. Field lists keep
//! declaration order, which is what a full projection returns.

use std::collections::BTreeMap;
use std::fmt;

use helixql_api::Value;

use crate::ast::{EdgeDecl, FieldDecl, FieldTypeExpr, NodeDecl};
use crate::error::{Error, Result};
use crate::parser::Parser;

#[derive(Debug, Clone, PartialEq)]
pub enum FieldType {
    String,
    Int,
    Float,
    Boolean,
    /// Inline enumeration. `adt` is the owning-type-qualified identity,
    /// e.g. `Follows.Status`; two fields with identical variant lists
    /// are still distinct types.
    Adt {
        adt: String,
        variants: Vec<String>,
    },
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Boolean => write!(f, "Boolean"),
            FieldType::Adt { adt, .. } => write!(f, "{adt}"),
        }
    }
}

impl FieldType {
    /// Does `value` inhabit this type? Tags must carry the exact ADT
    /// identity and a declared variant.
    pub fn admits(&self, value: &Value) -> bool {
        match (self, value) {
            (FieldType::String, Value::String(_)) => true,
            (FieldType::Int, Value::Int(_)) => true,
            (FieldType::Float, Value::Float(_)) => true,
            (FieldType::Boolean, Value::Boolean(_)) => true,
            (FieldType::Adt { adt, variants }, Value::Tag { adt: got, variant }) => {
                adt == got && variants.iter().any(|v| v == variant)
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub ty: FieldType,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeType {
    pub name: String,
    pub fields: Vec<FieldDef>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EdgeType {
    pub name: String,
    pub from: String,
    pub to: String,
    pub fields: Vec<FieldDef>,
}

impl NodeType {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

impl EdgeType {
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: BTreeMap<String, NodeType>,
    edges: BTreeMap<String, EdgeType>,
}

impl Schema {
    /// Build a registry from parsed declarations. Rejects duplicate
    /// type names, duplicate fields, empty or duplicated variant sets,
    /// and edges whose endpoints are not declared node types.
    pub fn from_decls(nodes: &[NodeDecl], edges: &[EdgeDecl]) -> Result<Self> {
        let mut schema = Schema::default();
        for decl in nodes {
            if schema.contains(&decl.name) {
                return Err(Error::bind(format!("duplicate type `{}`", decl.name)));
            }
            let fields = build_fields(&decl.name, &decl.fields)?;
            schema.nodes.insert(
                decl.name.clone(),
                NodeType {
                    name: decl.name.clone(),
                    fields,
                },
            );
        }
        for decl in edges {
            if schema.contains(&decl.name) {
                return Err(Error::bind(format!("duplicate type `{}`", decl.name)));
            }
            for endpoint in [&decl.from, &decl.to] {
                if !schema.nodes.contains_key(endpoint) {
                    return Err(Error::bind(format!(
                        "edge `{}` references unknown node type `{endpoint}`",
                        decl.name
                    )));
                }
            }
            let fields = build_fields(&decl.name, &decl.fields)?;
            schema.edges.insert(
                decl.name.clone(),
                EdgeType {
                    name: decl.name.clone(),
                    from: decl.from.clone(),
                    to: decl.to.clone(),
                    fields,
                },
            );
        }
        Ok(schema)
    }

    /// Parse schema declarations out of source text. Query declarations
    /// in the text are ignored here; `QuerySet` compiles those.
    pub fn parse(input: &str) -> Result<Self> {
        let source = Parser::parse_source(input)?;
        Self::from_decls(&source.nodes, &source.edges)
    }

    pub fn node_type(&self, name: &str) -> Option<&NodeType> {
        self.nodes.get(name)
    }

    pub fn edge_type(&self, name: &str) -> Option<&EdgeType> {
        self.edges.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name) || self.edges.contains_key(name)
    }

    /// Edge types whose source endpoint is `node`, in name order. The
    /// returned edges borrow the schema, not the label.
    pub fn edges_from<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a EdgeType> {
        self.edges.values().filter(move |e| e.from == node)
    }

    /// Edge types whose target endpoint is `node`, in name order. The
    /// returned edges borrow the schema, not the label.
    pub fn edges_to<'a>(&'a self, node: &str) -> impl Iterator<Item = &'a EdgeType> {
        self.edges.values().filter(move |e| e.to == node)
    }

    /// Every declared edge type, in name order.
    pub fn edge_types(&self) -> impl Iterator<Item = &EdgeType> {
        self.edges.values()
    }

    /// Construct a checked tag value for an ADT field, e.g.
    /// `schema.tag("Follows", "Status", "Active")`.
    pub fn tag(&self, type_name: &str, field: &str, variant: &str) -> Result<Value> {
        let def = self
            .field_of(type_name, field)
            .ok_or_else(|| Error::bind(format!("unknown field `{type_name}`.`{field}`")))?;
        match &def.ty {
            FieldType::Adt { adt, variants } => {
                if variants.iter().any(|v| v == variant) {
                    Ok(Value::tag(adt.clone(), variant))
                } else {
                    Err(Error::bind(format!(
                        "`{adt}` has no variant `{variant}`"
                    )))
                }
            }
            other => Err(Error::bind(format!(
                "field `{type_name}`.`{field}` is {other}, not an enumeration"
            ))),
        }
    }

    fn field_of(&self, type_name: &str, field: &str) -> Option<&FieldDef> {
        if let Some(node) = self.nodes.get(type_name) {
            return node.field(field);
        }
        self.edges.get(type_name).and_then(|e| e.field(field))
    }
}

fn build_fields(owner: &str, decls: &[FieldDecl]) -> Result<Vec<FieldDef>> {
    let mut fields: Vec<FieldDef> = Vec::with_capacity(decls.len());
    for decl in decls {
        if fields.iter().any(|f| f.name == decl.name) {
            return Err(Error::bind(format!(
                "duplicate field `{}` on type `{owner}`",
                decl.name
            )));
        }
        let ty = match &decl.ty {
            FieldTypeExpr::Named(name) => match name.as_str() {
                "String" => FieldType::String,
                "Int" => FieldType::Int,
                "Float" => FieldType::Float,
                "Boolean" => FieldType::Boolean,
                other => {
                    return Err(Error::bind(format!(
                        "unknown field type `{other}` on `{owner}`.`{}`",
                        decl.name
                    )));
                }
            },
            FieldTypeExpr::Variants(variants) => {
                if variants.is_empty() {
                    return Err(Error::bind(format!(
                        "enumeration `{owner}`.`{}` has no variants",
                        decl.name
                    )));
                }
                let mut seen: Vec<&str> = Vec::new();
                for variant in variants {
                    if seen.contains(&variant.as_str()) {
                        return Err(Error::bind(format!(
                            "duplicate variant `{variant}` on `{owner}`.`{}`",
                            decl.name
                        )));
                    }
                    seen.push(variant);
                }
                FieldType::Adt {
                    adt: format!("{owner}.{}", decl.name),
                    variants: variants.clone(),
                }
            }
        };
        fields.push(FieldDef {
            name: decl.name.clone(),
            ty,
        });
    }
    Ok(fields)
}

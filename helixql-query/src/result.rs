//! Result materializer: shapes the executor's binding stream into rows,
//! JSON, or a cursor.
//!
//! Count and sub-projection items are computed once from the collected
//! bindings and repeated on every row; field items are read per element.
//! A return clause with no per-element item emits exactly one row.

use std::collections::BTreeMap;
use std::fmt;

use helixql_api::Value;

use crate::ast::Modifier;
use crate::bind::{BoundItem, BoundReturn};
use crate::error::{Error, Result};
use crate::exec::{Binding, Element, Evaluated, Stream};
use crate::schema::Schema;

/// One projected column value: a scalar, or the nested block a
/// sub-projection (`Var::{...}`) produces.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Value(Value),
    Rows(Vec<Row>),
}

impl Cell {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Cell::Value(value) => Some(value),
            Cell::Rows(_) => None,
        }
    }

    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            Cell::Rows(rows) => Some(rows),
            Cell::Value(_) => None,
        }
    }
}

/// Ordered (column name, cell) pairs; order is the written order of the
/// return clause, with `*` expanding to schema declaration order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pub columns: Vec<(String, Cell)>,
}

impl Row {
    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.columns
            .iter()
            .find(|(column, _)| column == name)
            .map(|(_, cell)| cell)
    }

    /// Scalar shortcut for the common single-value column.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name).and_then(Cell::as_value)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// What a query run hands back, per the return modifier.
pub enum Outcome<'a> {
    Rows(Vec<Row>),
    Json(serde_json::Value),
    Cursor(Cursor<'a>),
}

// The cursor variant holds a live stream and renders opaquely.
impl fmt::Debug for Outcome<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Rows(rows) => f.debug_tuple("Rows").field(rows).finish(),
            Outcome::Json(value) => f.debug_tuple("Json").field(value).finish(),
            Outcome::Cursor(_) => f.write_str("Cursor(..)"),
        }
    }
}

impl<'a> Outcome<'a> {
    pub fn as_rows(&self) -> Option<&[Row]> {
        match self {
            Outcome::Rows(rows) => Some(rows),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&serde_json::Value> {
        match self {
            Outcome::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_cursor(self) -> Option<Cursor<'a>> {
        match self {
            Outcome::Cursor(cursor) => Some(cursor),
            _ => None,
        }
    }
}

/// Shape an evaluated query into its outcome. The outcome borrows only
/// the stream (and through it the snapshot), never the compiled query.
pub fn materialize<'a>(
    schema: &Schema,
    ret: &BoundReturn,
    evaluated: Evaluated<'a>,
) -> Result<Outcome<'a>> {
    let materializer = Materializer::new(schema, ret, &evaluated.named)?;
    match ret.modifier {
        None => Ok(Outcome::Rows(materializer.rows(evaluated.last)?)),
        Some(Modifier::Json) => {
            let rows = materializer.rows(evaluated.last)?;
            Ok(Outcome::Json(serde_json::Value::Array(
                rows.iter().map(row_to_json).collect(),
            )))
        }
        Some(Modifier::Next) => Ok(Outcome::Cursor(Cursor::new(
            materializer,
            evaluated.last,
        )?)),
    }
}

/// Per-item projection recipe, with row-independent cells precomputed.
enum Recipe {
    All,
    Field(String),
    Ready(String, Cell),
}

struct Materializer {
    schema: Schema,
    recipes: Vec<Recipe>,
    per_element: bool,
}

impl Materializer {
    fn new(
        schema: &Schema,
        ret: &BoundReturn,
        named: &BTreeMap<String, Vec<Binding>>,
    ) -> Result<Self> {
        let mut recipes = Vec::with_capacity(ret.items.len());
        let mut per_element = false;
        for item in &ret.items {
            let recipe = match item {
                BoundItem::All => {
                    per_element = true;
                    Recipe::All
                }
                BoundItem::Field(name) => {
                    per_element = true;
                    Recipe::Field(name.clone())
                }
                BoundItem::Count(var) => {
                    let bindings = named.get(var).ok_or_else(|| {
                        Error::internal(format!("binding `{var}` was not collected"))
                    })?;
                    Recipe::Ready(
                        format!("COUNT({var})"),
                        Cell::Value(Value::Int(bindings.len() as i64)),
                    )
                }
                BoundItem::Projection { var, fields } => {
                    let bindings = named.get(var).ok_or_else(|| {
                        Error::internal(format!("binding `{var}` was not collected"))
                    })?;
                    let mut rows = Vec::with_capacity(bindings.len());
                    for binding in bindings {
                        let mut columns = Vec::with_capacity(fields.len());
                        for field in fields {
                            columns.push((
                                field.clone(),
                                Cell::Value(read_field(&binding.element, field)?),
                            ));
                        }
                        rows.push(Row { columns });
                    }
                    Recipe::Ready(var.clone(), Cell::Rows(rows))
                }
            };
            recipes.push(recipe);
        }
        Ok(Materializer {
            schema: schema.clone(),
            recipes,
            per_element,
        })
    }

    fn row_for(&self, binding: &Binding) -> Result<Row> {
        let mut columns = Vec::new();
        for recipe in &self.recipes {
            match recipe {
                Recipe::All => self.expand_all(&binding.element, &mut columns)?,
                Recipe::Field(name) => {
                    columns.push((name.clone(), Cell::Value(read_field(&binding.element, name)?)));
                }
                Recipe::Ready(name, cell) => columns.push((name.clone(), cell.clone())),
            }
        }
        Ok(Row { columns })
    }

    /// Declared fields of the element's own type, in declaration order.
    fn expand_all(&self, element: &Element, columns: &mut Vec<(String, Cell)>) -> Result<()> {
        let label = element.label();
        let fields = if let Some(node) = self.schema.node_type(label) {
            &node.fields
        } else if let Some(edge) = self.schema.edge_type(label) {
            &edge.fields
        } else {
            return Err(Error::internal(format!(
                "stored element type `{label}` is not declared"
            )));
        };
        for field in fields {
            columns.push((
                field.name.clone(),
                Cell::Value(read_field(element, &field.name)?),
            ));
        }
        Ok(())
    }

    /// Eager materialization. Without a per-element item the stream is
    /// still drained so traversal failures surface.
    fn rows(&self, stream: Stream<'_>) -> Result<Vec<Row>> {
        if self.per_element {
            let mut rows = Vec::new();
            for item in stream {
                rows.push(self.row_for(&item?)?);
            }
            Ok(rows)
        } else {
            for item in stream {
                item?;
            }
            Ok(vec![self.row_for_static()])
        }
    }

    /// The single row a count-only or projection-only return emits.
    fn row_for_static(&self) -> Row {
        let columns = self
            .recipes
            .iter()
            .filter_map(|recipe| match recipe {
                Recipe::Ready(name, cell) => Some((name.clone(), cell.clone())),
                _ => None,
            })
            .collect();
        Row { columns }
    }
}

fn read_field(element: &Element, name: &str) -> Result<Value> {
    element.property(name).cloned().ok_or_else(|| {
        Error::internal(format!(
            "field `{name}` is missing on stored element {}",
            element.id()
        ))
    })
}

/// Incremental retrieval. Advances one row per call, never rewinds, and
/// reports exhaustion as an empty result rather than an error. The
/// cursor fuses after the stream ends or fails.
pub struct Cursor<'a> {
    materializer: Materializer,
    source: CursorSource<'a>,
    done: bool,
}

enum CursorSource<'a> {
    Stream(Stream<'a>),
    Ready(std::vec::IntoIter<Row>),
}

impl<'a> Cursor<'a> {
    fn new(materializer: Materializer, stream: Stream<'a>) -> Result<Self> {
        let source = if materializer.per_element {
            CursorSource::Stream(stream)
        } else {
            // Count-only form: one precomputed row, stream drained now
            // so its failures are not deferred behind the first NEXT.
            for item in stream {
                item?;
            }
            let row = materializer.row_for_static();
            CursorSource::Ready(vec![row].into_iter())
        };
        Ok(Cursor {
            materializer,
            source,
            done: false,
        })
    }

    pub fn next(&mut self) -> Result<Option<Row>> {
        if self.done {
            return Ok(None);
        }
        let step = match &mut self.source {
            CursorSource::Ready(rows) => rows.next().map(Ok),
            CursorSource::Stream(stream) => match stream.next() {
                None => None,
                Some(Err(e)) => Some(Err(e)),
                Some(Ok(binding)) => Some(self.materializer.row_for(&binding)),
            },
        };
        match step {
            None => {
                self.done = true;
                Ok(None)
            }
            Some(Err(e)) => {
                self.done = true;
                Err(e)
            }
            Some(Ok(row)) => Ok(Some(row)),
        }
    }
}

fn row_to_json(row: &Row) -> serde_json::Value {
    let mut object = serde_json::Map::new();
    for (name, cell) in &row.columns {
        object.insert(name.clone(), cell_to_json(cell));
    }
    serde_json::Value::Object(object)
}

fn cell_to_json(cell: &Cell) -> serde_json::Value {
    match cell {
        Cell::Value(value) => value_to_json(value),
        Cell::Rows(rows) => serde_json::Value::Array(rows.iter().map(row_to_json).collect()),
    }
}

/// Output encoding of field values. Tags encode as their variant name;
/// this is the wire shape, distinct from the storage encoding.
fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Int(i) => serde_json::Value::Number((*i).into()),
        Value::Float(f) => serde_json::Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::Boolean(b) => serde_json::Value::Bool(*b),
        Value::Tag { variant, .. } => serde_json::Value::String(variant.clone()),
        Value::Null => serde_json::Value::Null,
    }
}

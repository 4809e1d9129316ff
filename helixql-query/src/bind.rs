//! Binder: resolves a parsed query against the schema registry and
//! lowers it to a step plan the executor can run without further name
//! lookups.
//!
//! Binding tracks a scope through each traversal: the element type the
//! chain currently stands on, plus the edge type it arrived through
//! when the last step was a node hop. Every name in the query resolves
//! here or the query is rejected before any storage access.

use std::collections::BTreeMap;

use uuid::Uuid;

use helixql_api::Value;

use crate::ast::{
    IdArg, Modifier, Predicate, QueryDecl, ReturnItem, StartSelector, Statement, Step, StepKind,
    TraversalExpr,
};
use crate::error::{Error, Result};
use crate::schema::{EdgeType, FieldDef, FieldType, Schema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    Edge,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamType {
    String,
    Int,
    Float,
    Boolean,
}

impl ParamType {
    pub fn name(self) -> &'static str {
        match self {
            ParamType::String => "String",
            ParamType::Int => "Int",
            ParamType::Float => "Float",
            ParamType::Boolean => "Boolean",
        }
    }

    pub fn admits(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ParamType::String, Value::String(_))
                | (ParamType::Int, Value::Int(_))
                | (ParamType::Float, Value::Float(_))
                | (ParamType::Boolean, Value::Boolean(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundParam {
    pub name: String,
    pub ty: ParamType,
}

#[derive(Debug, Clone, PartialEq)]
pub enum IdSource {
    Param(String),
    Literal(Uuid),
}

/// Which element of the current binding a filter inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterTarget {
    Element,
    ViaEdge,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundStep {
    /// Scan the type index for one label.
    SeedType { label: String, kind: ElementKind },
    /// Point lookup; a miss is a hard NotFound.
    SeedId {
        label: String,
        kind: ElementKind,
        source: IdSource,
    },
    SeedNodes,
    SeedEdges,
    /// All nodes, then all edges.
    SeedAll,
    /// Node-to-node hop over one edge type, keeping the crossed edge.
    HopNode { direction: Direction, edge: String },
    /// Node-to-edge hop; the scope becomes the incident edges.
    HopEdge { direction: Direction, edge: String },
    Filter {
        target: FilterTarget,
        field: String,
        adt: String,
        variant: String,
    },
    Distinct,
    Limit(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundPipeline {
    /// Binding name; the unnamed form gets `None`.
    pub var: Option<String>,
    pub steps: Vec<BoundStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BoundItem {
    /// Full projection; fields resolve per element from its own label.
    All,
    /// Field of the final pipeline's elements.
    Field(String),
    /// Eager cardinality of a named binding.
    Count(String),
    /// Fields of a named binding's elements.
    Projection { var: String, fields: Vec<String> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundReturn {
    pub items: Vec<BoundItem>,
    pub modifier: Option<Modifier>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoundQuery {
    pub name: String,
    pub params: Vec<BoundParam>,
    pub pipelines: Vec<BoundPipeline>,
    pub ret: BoundReturn,
}

impl BoundQuery {
    /// Pipelines whose elements the return clause reads by name.
    pub fn referenced_vars(&self) -> Vec<&str> {
        let mut vars = Vec::new();
        for item in &self.ret.items {
            let var = match item {
                BoundItem::Count(var) | BoundItem::Projection { var, .. } => var.as_str(),
                _ => continue,
            };
            if !vars.contains(&var) {
                vars.push(var);
            }
        }
        vars
    }
}

/// Element type the binder is currently standing on.
#[derive(Debug, Clone, PartialEq)]
enum ScopeKind {
    Node(Option<String>),
    Edge(Option<String>),
    /// Bare GET: nodes then edges, no single element kind.
    Mixed,
}

#[derive(Debug, Clone, PartialEq)]
struct Scope {
    kind: ScopeKind,
    /// Edge type crossed by the most recent node hop, if any.
    via: Option<String>,
}

impl ScopeKind {
    fn describe(&self) -> String {
        match self {
            ScopeKind::Node(Some(label)) => format!("`{label}` nodes"),
            ScopeKind::Node(None) => "untyped nodes".to_string(),
            ScopeKind::Edge(Some(label)) => format!("`{label}` edges"),
            ScopeKind::Edge(None) => "untyped edges".to_string(),
            ScopeKind::Mixed => "mixed elements".to_string(),
        }
    }
}

impl Scope {
    fn describe(&self) -> String {
        self.kind.describe()
    }
}

struct PipelineState {
    var: Option<String>,
    steps: Vec<BoundStep>,
    scope: Scope,
    limited: bool,
}

pub struct Binder<'a> {
    schema: &'a Schema,
    params: Vec<BoundParam>,
    pipelines: Vec<PipelineState>,
}

impl<'a> Binder<'a> {
    pub fn bind(schema: &'a Schema, query: &QueryDecl) -> Result<BoundQuery> {
        let mut binder = Binder {
            schema,
            params: Vec::new(),
            pipelines: Vec::new(),
        };
        binder.bind_params(query)?;
        for statement in &query.statements {
            binder.bind_statement(statement)?;
        }
        let ret = binder.bind_return(query)?;
        log::debug!(
            "bound query `{}`: {} pipeline(s), {} return item(s)",
            query.name,
            binder.pipelines.len(),
            ret.items.len()
        );
        Ok(BoundQuery {
            name: query.name.clone(),
            params: binder.params,
            pipelines: binder
                .pipelines
                .into_iter()
                .map(|p| BoundPipeline {
                    var: p.var,
                    steps: p.steps,
                })
                .collect(),
            ret,
        })
    }

    fn bind_params(&mut self, query: &QueryDecl) -> Result<()> {
        for param in &query.params {
            if self.params.iter().any(|p| p.name == param.name) {
                return Err(Error::bind(format!(
                    "duplicate parameter `{}`",
                    param.name
                )));
            }
            let ty = match param.ty.as_str() {
                "String" => ParamType::String,
                "Int" => ParamType::Int,
                "Float" => ParamType::Float,
                "Boolean" => ParamType::Boolean,
                other => {
                    return Err(Error::bind(format!(
                        "unknown parameter type `{other}` for `{}`",
                        param.name
                    )));
                }
            };
            self.params.push(BoundParam {
                name: param.name.clone(),
                ty,
            });
        }
        Ok(())
    }

    fn bind_statement(&mut self, statement: &Statement) -> Result<()> {
        match statement {
            Statement::Assign { var, expr } => {
                if self.pipelines.iter().any(|p| p.var.as_deref() == Some(var)) {
                    return Err(Error::bind(format!("binding `{var}` assigned twice")));
                }
                let pipeline = self.bind_traversal(Some(var.clone()), expr)?;
                self.pipelines.push(pipeline);
            }
            Statement::Traverse(expr) => {
                let pipeline = self.bind_traversal(None, expr)?;
                self.pipelines.push(pipeline);
            }
            Statement::Where(predicate) => self.bind_where(predicate)?,
            Statement::Limit(count) => self.bind_limit(*count)?,
        }
        Ok(())
    }

    fn bind_traversal(
        &mut self,
        var: Option<String>,
        expr: &TraversalExpr,
    ) -> Result<PipelineState> {
        let mut steps = Vec::new();
        let mut scope = self.bind_start(&expr.start, &mut steps)?;
        for step in &expr.steps {
            scope = self.bind_step(step, &scope, &mut steps)?;
        }
        if expr.distinct {
            steps.push(BoundStep::Distinct);
        }
        Ok(PipelineState {
            var,
            steps,
            scope,
            limited: false,
        })
    }

    fn bind_start(&mut self, start: &StartSelector, steps: &mut Vec<BoundStep>) -> Result<Scope> {
        let scope = match start {
            StartSelector::Typed(name) => {
                let (kind, scope_kind) = self.classify_type(name)?;
                steps.push(BoundStep::SeedType {
                    label: name.clone(),
                    kind,
                });
                scope_kind
            }
            StartSelector::ById { ty, id } => {
                let (kind, scope_kind) = self.classify_type(ty)?;
                let source = match id {
                    IdArg::Param(name) => {
                        let param = self
                            .params
                            .iter()
                            .find(|p| p.name == *name)
                            .ok_or_else(|| {
                                Error::bind(format!("unknown parameter `{name}`"))
                            })?;
                        if param.ty != ParamType::String {
                            return Err(Error::bind(format!(
                                "id parameter `{name}` must be String, not {}",
                                param.ty.name()
                            )));
                        }
                        IdSource::Param(name.clone())
                    }
                    IdArg::Literal(text) => {
                        let id = Uuid::parse_str(text).map_err(|_| {
                            Error::bind(format!("`{text}` is not a valid element id"))
                        })?;
                        IdSource::Literal(id)
                    }
                };
                steps.push(BoundStep::SeedId {
                    label: ty.clone(),
                    kind,
                    source,
                });
                scope_kind
            }
            StartSelector::AllNodes => {
                steps.push(BoundStep::SeedNodes);
                ScopeKind::Node(None)
            }
            StartSelector::AllEdges => {
                steps.push(BoundStep::SeedEdges);
                ScopeKind::Edge(None)
            }
            StartSelector::Everything => {
                steps.push(BoundStep::SeedAll);
                ScopeKind::Mixed
            }
        };
        Ok(Scope {
            kind: scope,
            via: None,
        })
    }

    fn classify_type(&self, name: &str) -> Result<(ElementKind, ScopeKind)> {
        if self.schema.node_type(name).is_some() {
            Ok((ElementKind::Node, ScopeKind::Node(Some(name.to_string()))))
        } else if self.schema.edge_type(name).is_some() {
            Ok((ElementKind::Edge, ScopeKind::Edge(Some(name.to_string()))))
        } else {
            Err(Error::bind(format!("unknown type `{name}`")))
        }
    }

    fn bind_step(&self, step: &Step, scope: &Scope, steps: &mut Vec<BoundStep>) -> Result<Scope> {
        let node_label = match &scope.kind {
            ScopeKind::Node(label) => label.as_deref(),
            _ => {
                return Err(Error::bind(format!(
                    "cannot traverse from {}",
                    scope.describe()
                )));
            }
        };
        let direction = match step.kind {
            StepKind::In | StepKind::InE => Direction::In,
            StepKind::Out | StepKind::OutE => Direction::Out,
        };
        let edge = self.resolve_hop_edge(step, node_label, direction)?;
        match step.kind {
            StepKind::In => {
                steps.push(BoundStep::HopNode {
                    direction,
                    edge: edge.name.clone(),
                });
                Ok(Scope {
                    kind: ScopeKind::Node(Some(edge.from.clone())),
                    via: Some(edge.name.clone()),
                })
            }
            StepKind::Out => {
                steps.push(BoundStep::HopNode {
                    direction,
                    edge: edge.name.clone(),
                });
                Ok(Scope {
                    kind: ScopeKind::Node(Some(edge.to.clone())),
                    via: Some(edge.name.clone()),
                })
            }
            StepKind::InE | StepKind::OutE => {
                steps.push(BoundStep::HopEdge {
                    direction,
                    edge: edge.name.clone(),
                });
                Ok(Scope {
                    kind: ScopeKind::Edge(Some(edge.name.clone())),
                    via: None,
                })
            }
        }
    }

    /// Resolve the edge type a hop crosses. Qualified hops name it;
    /// unqualified hops need exactly one candidate for the scope.
    fn resolve_hop_edge(
        &self,
        step: &Step,
        node_label: Option<&str>,
        direction: Direction,
    ) -> Result<&EdgeType> {
        if let Some(name) = &step.edge {
            let edge = self
                .schema
                .edge_type(name)
                .ok_or_else(|| Error::bind(format!("unknown edge type `{name}`")))?;
            if let Some(label) = node_label {
                let endpoint = match direction {
                    Direction::Out => &edge.from,
                    Direction::In => &edge.to,
                };
                if endpoint != label {
                    return Err(Error::bind(format!(
                        "edge `{name}` does not {} `{label}`",
                        match direction {
                            Direction::Out => "leave",
                            Direction::In => "arrive at",
                        }
                    )));
                }
            }
            return Ok(edge);
        }

        let candidates: Vec<&EdgeType> = match (node_label, direction) {
            (Some(label), Direction::Out) => self.schema.edges_from(label).collect(),
            (Some(label), Direction::In) => self.schema.edges_to(label).collect(),
            // From an untyped node scope every declared edge type is a
            // candidate.
            (None, _) => self.schema.edge_types().collect(),
        };
        match candidates.as_slice() {
            [edge] => Ok(edge),
            [] => Err(Error::bind(format!(
                "no edge type {} {}",
                match direction {
                    Direction::Out => "leaves",
                    Direction::In => "arrives at",
                },
                node_label.map_or("this scope".to_string(), |l| format!("`{l}`"))
            ))),
            many => {
                let names: Vec<&str> = many.iter().map(|e| e.name.as_str()).collect();
                Err(Error::bind(format!(
                    "ambiguous hop: candidates are {}; qualify the step with ::EdgeType",
                    names.join(", ")
                )))
            }
        }
    }

    fn bind_where(&mut self, predicate: &Predicate) -> Result<()> {
        let pipeline = self
            .pipelines
            .last_mut()
            .ok_or_else(|| Error::bind("WHERE before any traversal".to_string()))?;
        if pipeline.limited {
            return Err(Error::bind("WHERE must precede LIMIT".to_string()));
        }
        let (target, owner, field) =
            resolve_filter_field(self.schema, &pipeline.scope, &predicate.field)?;
        let FieldType::Adt { adt, variants } = &field.ty else {
            return Err(Error::bind(format!(
                "field `{owner}`.`{}` is {}, not an enumeration",
                predicate.field, field.ty
            )));
        };
        if !variants.iter().any(|v| v == &predicate.variant) {
            return Err(Error::bind(format!(
                "`{adt}` has no variant `{}`",
                predicate.variant
            )));
        }
        pipeline.steps.push(BoundStep::Filter {
            target,
            field: predicate.field.clone(),
            adt: adt.clone(),
            variant: predicate.variant.clone(),
        });
        Ok(())
    }

    fn bind_limit(&mut self, count: u64) -> Result<()> {
        let pipeline = self
            .pipelines
            .last_mut()
            .ok_or_else(|| Error::bind("LIMIT before any traversal".to_string()))?;
        if pipeline.limited {
            return Err(Error::bind("duplicate LIMIT".to_string()));
        }
        if count == 0 {
            return Err(Error::bind("LIMIT must be positive".to_string()));
        }
        let count = usize::try_from(count)
            .map_err(|_| Error::bind(format!("LIMIT {count} is out of range")))?;
        pipeline.steps.push(BoundStep::Limit(count));
        pipeline.limited = true;
        Ok(())
    }

    fn bind_return(&self, query: &QueryDecl) -> Result<BoundReturn> {
        let last = self
            .pipelines
            .last()
            .ok_or_else(|| Error::bind("query has no traversal".to_string()))?;
        let by_var: BTreeMap<&str, &PipelineState> = self
            .pipelines
            .iter()
            .filter_map(|p| p.var.as_deref().map(|v| (v, p)))
            .collect();

        let mut items = Vec::new();
        for item in &query.ret.items {
            match item {
                ReturnItem::All => items.push(BoundItem::All),
                ReturnItem::Field(name) => {
                    if by_var.contains_key(name.as_str()) {
                        return Err(Error::bind(format!(
                            "`{name}` is a binding; project it with `{name}::{{...}}` or COUNT({name})"
                        )));
                    }
                    check_projected_field(self.schema, &last.scope, name)?;
                    items.push(BoundItem::Field(name.clone()));
                }
                ReturnItem::Count(var) => {
                    if !by_var.contains_key(var.as_str()) {
                        return Err(Error::bind(format!("COUNT of unknown binding `{var}`")));
                    }
                    items.push(BoundItem::Count(var.clone()));
                }
                ReturnItem::Projection { var, fields } => {
                    let pipeline = by_var.get(var.as_str()).ok_or_else(|| {
                        Error::bind(format!("projection of unknown binding `{var}`"))
                    })?;
                    for field in fields {
                        check_projected_field(self.schema, &pipeline.scope, field)?;
                    }
                    items.push(BoundItem::Projection {
                        var: var.clone(),
                        fields: fields.clone(),
                    });
                }
            }
        }
        Ok(BoundReturn {
            items,
            modifier: query.ret.modifier,
        })
    }
}

/// Decide whether a filter field lives on the scope's own elements or
/// on the edge the last hop crossed. Returns the target, the owning
/// type name, and the field definition.
fn resolve_filter_field<'s>(
    schema: &'s Schema,
    scope: &Scope,
    field: &str,
) -> Result<(FilterTarget, String, &'s FieldDef)> {
    match &scope.kind {
        ScopeKind::Node(Some(label)) => {
            let node = schema
                .node_type(label)
                .ok_or_else(|| Error::internal(format!("scope type `{label}` vanished")))?;
            if let Some(def) = node.field(field) {
                return Ok((FilterTarget::Element, label.clone(), def));
            }
            if let Some(via) = &scope.via
                && let Some(def) = schema.edge_type(via).and_then(|e| e.field(field))
            {
                return Ok((FilterTarget::ViaEdge, via.clone(), def));
            }
            match &scope.via {
                Some(via) => Err(Error::bind(format!(
                    "unknown field `{field}` on `{label}` or arriving edge `{via}`"
                ))),
                None => Err(Error::bind(format!(
                    "unknown field `{field}` on `{label}`"
                ))),
            }
        }
        ScopeKind::Edge(Some(label)) => {
            let edge = schema
                .edge_type(label)
                .ok_or_else(|| Error::internal(format!("scope type `{label}` vanished")))?;
            match edge.field(field) {
                Some(def) => Ok((FilterTarget::Element, label.clone(), def)),
                None => Err(Error::bind(format!(
                    "unknown field `{field}` on `{label}`"
                ))),
            }
        }
        _ => Err(Error::bind(format!(
            "WHERE needs a typed scope, not {}",
            scope.describe()
        ))),
    }
}

fn check_projected_field(schema: &Schema, scope: &Scope, field: &str) -> Result<()> {
    match &scope.kind {
        ScopeKind::Node(Some(label)) => {
            if schema
                .node_type(label)
                .is_some_and(|t| t.field(field).is_some())
            {
                Ok(())
            } else {
                Err(Error::bind(format!(
                    "unknown field `{field}` on `{label}`"
                )))
            }
        }
        ScopeKind::Edge(Some(label)) => {
            if schema
                .edge_type(label)
                .is_some_and(|t| t.field(field).is_some())
            {
                Ok(())
            } else {
                Err(Error::bind(format!(
                    "unknown field `{field}` on `{label}`"
                )))
            }
        }
        other => Err(Error::bind(format!(
            "cannot project field `{field}` from {}",
            other.describe()
        ))),
    }
}

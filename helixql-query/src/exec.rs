//! Executor: pulls bindings through a bound step plan against a
//! [`GraphSnapshot`].
//!
//! Pipelines are lazy. Each stage wraps the previous iterator, so a
//! binding is not computed until something asks for it, and a dropped
//! stream abandons the remaining work. Errors travel through the
//! stream as items; consumers stop at the first `Err` they see.

use std::collections::{BTreeMap, HashSet};

use uuid::Uuid;

use helixql_api::{Edge, GraphSnapshot, Node, Value};

use crate::bind::{
    BoundPipeline, BoundQuery, BoundStep, Direction, ElementKind, FilterTarget, IdSource,
};
use crate::error::{Error, Result};

/// One traversal position: a node or an edge.
#[derive(Debug, Clone, PartialEq)]
pub enum Element {
    Node(Node),
    Edge(Edge),
}

impl Element {
    pub fn id(&self) -> Uuid {
        match self {
            Element::Node(node) => node.id,
            Element::Edge(edge) => edge.id,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Element::Node(node) => &node.label,
            Element::Edge(edge) => &edge.label,
        }
    }

    pub fn properties(&self) -> &BTreeMap<String, Value> {
        match self {
            Element::Node(node) => &node.properties,
            Element::Edge(edge) => &edge.properties,
        }
    }

    pub fn property(&self, name: &str) -> Option<&Value> {
        self.properties().get(name)
    }
}

/// An element plus the edge the last node hop crossed to reach it.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub element: Element,
    pub via: Option<Edge>,
}

impl Binding {
    fn node(node: Node) -> Self {
        Binding {
            element: Element::Node(node),
            via: None,
        }
    }

    fn edge(edge: Edge) -> Self {
        Binding {
            element: Element::Edge(edge),
            via: None,
        }
    }

    fn hopped(node: Node, via: Edge) -> Self {
        Binding {
            element: Element::Node(node),
            via: Some(via),
        }
    }
}

pub type Stream<'a> = Box<dyn Iterator<Item = Result<Binding>> + 'a>;

/// Pipelines evaluated for one query run: eagerly collected bindings
/// for every name the return clause reads, and the final pipeline as a
/// stream the materializer consumes.
pub struct Evaluated<'a> {
    pub named: BTreeMap<String, Vec<Binding>>,
    pub last: Stream<'a>,
}

/// Run every pipeline of a bound query. Pipelines the return clause
/// never reads are still drained so their failures surface; the final
/// pipeline stays lazy unless it is itself read by name.
///
/// The returned streams borrow only the snapshot; plan data is copied
/// into the stages, so the bound query may be dropped while a stream
/// is still open.
pub fn evaluate<'a, S: GraphSnapshot>(
    snapshot: &'a S,
    query: &BoundQuery,
    params: &BTreeMap<String, Value>,
) -> Result<Evaluated<'a>> {
    let exec = Executor::new(snapshot, params);
    let referenced = query.referenced_vars();
    let (last, rest) = query
        .pipelines
        .split_last()
        .ok_or_else(|| Error::internal("bound query has no pipelines".to_string()))?;

    let mut named: BTreeMap<String, Vec<Binding>> = BTreeMap::new();
    for pipeline in rest {
        let stream = exec.stream(pipeline)?;
        if let Some(var) = pipeline.var.as_deref()
            && referenced.contains(&var)
        {
            let bindings: Vec<Binding> = stream.collect::<Result<_>>()?;
            log::debug!("pipeline `{var}` produced {} binding(s)", bindings.len());
            named.insert(var.to_string(), bindings);
        } else {
            for item in stream {
                item?;
            }
        }
    }

    let stream = exec.stream(last)?;
    let last = if let Some(var) = last.var.as_deref()
        && referenced.contains(&var)
    {
        let bindings: Vec<Binding> = stream.collect::<Result<_>>()?;
        named.insert(var.to_string(), bindings.clone());
        Box::new(bindings.into_iter().map(Ok)) as Stream<'a>
    } else {
        stream
    };
    Ok(Evaluated { named, last })
}

struct Executor<'a, 'p, S> {
    snapshot: &'a S,
    params: &'p BTreeMap<String, Value>,
}

impl<'a, 'p, S: GraphSnapshot> Executor<'a, 'p, S> {
    fn new(snapshot: &'a S, params: &'p BTreeMap<String, Value>) -> Self {
        Executor { snapshot, params }
    }

    fn stream(&self, pipeline: &BoundPipeline) -> Result<Stream<'a>> {
        let mut stream: Stream<'a> = Box::new(std::iter::empty());
        for step in &pipeline.steps {
            stream = self.apply(step, stream)?;
        }
        Ok(stream)
    }

    fn apply(&self, step: &BoundStep, input: Stream<'a>) -> Result<Stream<'a>> {
        Ok(match step {
            BoundStep::SeedType { label, kind } => self.seed_type(label, *kind),
            BoundStep::SeedId {
                label,
                kind,
                source,
            } => self.seed_id(label, *kind, source)?,
            BoundStep::SeedNodes => Box::new(
                self.snapshot
                    .nodes()
                    .map(|item| item.map(Binding::node).map_err(Error::from)),
            ),
            BoundStep::SeedEdges => Box::new(
                self.snapshot
                    .edges()
                    .map(|item| item.map(Binding::edge).map_err(Error::from)),
            ),
            BoundStep::SeedAll => {
                let nodes = self
                    .snapshot
                    .nodes()
                    .map(|item| item.map(Binding::node).map_err(Error::from));
                let edges = self
                    .snapshot
                    .edges()
                    .map(|item| item.map(Binding::edge).map_err(Error::from));
                Box::new(nodes.chain(edges))
            }
            BoundStep::HopNode { direction, edge } => self.hop_node(input, *direction, edge),
            BoundStep::HopEdge { direction, edge } => self.hop_edge(input, *direction, edge),
            BoundStep::Filter {
                target,
                field,
                adt,
                variant,
            } => filter(input, *target, field, adt, variant),
            BoundStep::Distinct => distinct(input),
            BoundStep::Limit(count) => Box::new(input.take(*count)),
        })
    }

    fn seed_type(&self, label: &str, kind: ElementKind) -> Stream<'a> {
        match kind {
            ElementKind::Node => Box::new(
                self.snapshot
                    .nodes_with_label(label)
                    .map(|item| item.map(Binding::node).map_err(Error::from)),
            ),
            ElementKind::Edge => Box::new(
                self.snapshot
                    .edges_with_label(label)
                    .map(|item| item.map(Binding::edge).map_err(Error::from)),
            ),
        }
    }

    /// Point lookup. Resolves eagerly so a miss fails the whole run
    /// before any row is pulled.
    fn seed_id(&self, label: &str, kind: ElementKind, source: &IdSource) -> Result<Stream<'a>> {
        let id = match source {
            IdSource::Literal(id) => *id,
            IdSource::Param(name) => {
                let value = self.params.get(name).ok_or_else(|| {
                    Error::ParamMismatch(format!("missing parameter `{name}`"))
                })?;
                let Value::String(text) = value else {
                    return Err(Error::ParamMismatch(format!(
                        "parameter `{name}`: expected String, got {}",
                        value.kind()
                    )));
                };
                Uuid::parse_str(text).map_err(|_| {
                    Error::ParamMismatch(format!(
                        "parameter `{name}` is not a valid element id"
                    ))
                })?
            }
        };
        let binding = match kind {
            ElementKind::Node => self.snapshot.node(id)?.map(Binding::node),
            ElementKind::Edge => self.snapshot.edge(id)?.map(Binding::edge),
        };
        let binding = binding.ok_or_else(|| Error::NotFound {
            label: label.to_string(),
            id,
        })?;
        Ok(Box::new(std::iter::once(Ok(binding))))
    }

    /// Node-to-node hop: walk the adjacency index outer-then-inner and
    /// resolve each crossed edge's far endpoint. A missing endpoint is
    /// a dangling reference, reported against the edge that holds it.
    fn hop_node(&self, input: Stream<'a>, direction: Direction, edge: &str) -> Stream<'a> {
        let snapshot = self.snapshot;
        let edge = edge.to_string();
        Box::new(input.flat_map(move |item| -> Stream<'a> {
            let node_id = match item {
                Ok(binding) => binding.element.id(),
                Err(e) => return Box::new(std::iter::once(Err(e))),
            };
            let crossed = match direction {
                Direction::Out => snapshot.out_edges(node_id, Some(&edge)),
                Direction::In => snapshot.in_edges(node_id, Some(&edge)),
            };
            Box::new(crossed.map(move |item| {
                let crossed = item.map_err(Error::from)?;
                let far = match direction {
                    Direction::Out => crossed.dst,
                    Direction::In => crossed.src,
                };
                let node = snapshot.node(far)?.ok_or(Error::DanglingReference {
                    edge: crossed.id,
                    node: far,
                })?;
                Ok(Binding::hopped(node, crossed))
            }))
        }))
    }

    /// Node-to-edge hop: yield the incident edges themselves.
    fn hop_edge(&self, input: Stream<'a>, direction: Direction, edge: &str) -> Stream<'a> {
        let snapshot = self.snapshot;
        let edge = edge.to_string();
        Box::new(input.flat_map(move |item| -> Stream<'a> {
            let node_id = match item {
                Ok(binding) => binding.element.id(),
                Err(e) => return Box::new(std::iter::once(Err(e))),
            };
            let crossed = match direction {
                Direction::Out => snapshot.out_edges(node_id, Some(&edge)),
                Direction::In => snapshot.in_edges(node_id, Some(&edge)),
            };
            Box::new(crossed.map(|item| item.map(Binding::edge).map_err(Error::from)))
        }))
    }
}

/// Tag-equality filter. The binder proved the field is an enumeration
/// of the right identity, so a missing or differently-typed value at
/// run time means the store and schema disagree.
fn filter<'a>(
    input: Stream<'a>,
    target: FilterTarget,
    field: &str,
    adt: &str,
    variant: &str,
) -> Stream<'a> {
    let field = field.to_string();
    let adt = adt.to_string();
    let variant = variant.to_string();
    Box::new(input.filter_map(move |item| {
        let binding = match item {
            Ok(binding) => binding,
            Err(e) => return Some(Err(e)),
        };
        let id = binding.element.id();
        let keep = {
            let value = match target {
                FilterTarget::Element => binding.element.property(&field),
                FilterTarget::ViaEdge => {
                    binding.via.as_ref().and_then(|e| e.properties.get(&field))
                }
            };
            match value {
                Some(Value::Tag {
                    adt: got_adt,
                    variant: got,
                }) => Ok(*got_adt == adt && *got == variant),
                Some(other) => Err(Error::internal(format!(
                    "field `{field}` on {id} holds {} where a `{adt}` tag was expected",
                    other.kind()
                ))),
                None => Err(Error::internal(format!(
                    "field `{field}` is missing on {id}"
                ))),
            }
        };
        match keep {
            Ok(true) => Some(Ok(binding)),
            Ok(false) => None,
            Err(e) => Some(Err(e)),
        }
    }))
}

/// Keep the first occurrence of every element id.
fn distinct(input: Stream<'_>) -> Stream<'_> {
    let mut seen: HashSet<Uuid> = HashSet::new();
    Box::new(input.filter(move |item| match item {
        Ok(binding) => seen.insert(binding.element.id()),
        Err(_) => true,
    }))
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Source {
    pub nodes: Vec<NodeDecl>,
    pub edges: Vec<EdgeDecl>,
    pub queries: Vec<QueryDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDecl {
    pub name: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EdgeDecl {
    pub name: String,
    pub from: String,
    pub to: String,
    pub fields: Vec<FieldDecl>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FieldDecl {
    pub name: String,
    pub ty: FieldTypeExpr,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum FieldTypeExpr {
    Named(String),
    // Inline ADT declaration: `Status: { Active, Inactive }`
    Variants(Vec<String>),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryDecl {
    pub name: String,
    pub params: Vec<ParamDecl>,
    pub statements: Vec<Statement>,
    pub ret: ReturnClause,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParamDecl {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Statement {
    Assign { var: String, expr: TraversalExpr },
    Traverse(TraversalExpr),
    Where(Predicate),
    Limit(u64),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TraversalExpr {
    pub start: StartSelector,
    pub steps: Vec<Step>,
    pub distinct: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum StartSelector {
    // `GET User` – node or edge type, the binder decides which
    Typed(String),
    // `GET User(userID)` / `GET User("…uuid…")`
    ById { ty: String, id: IdArg },
    AllNodes,
    AllEdges,
    Everything,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum IdArg {
    Param(String),
    Literal(String),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub kind: StepKind,
    pub edge: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum StepKind {
    In,
    Out,
    InE,
    OutE,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Predicate {
    pub field: String,
    pub variant: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReturnClause {
    pub items: Vec<ReturnItem>,
    pub modifier: Option<Modifier>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum ReturnItem {
    All,
    Field(String),
    Count(String),
    // `Var::{A, B}`
    Projection { var: String, fields: Vec<String> },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum Modifier {
    Json,
    Next,
}

//! Layout error taxonomy. Anything the caller can fix (bad input, infeasible
//! constraints) is a variant; internal stage failures degrade instead of
//! erroring.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Infeasible rank constraints: {context}")]
    InfeasibleRanking { context: String },

    #[error("Malformed port on edge {edge}: {message}")]
    MalformedPort { edge: String, message: String },

    #[error("Graph has no nodes to lay out")]
    EmptyGraph,

    #[error("Edge {edge} references a missing endpoint")]
    DanglingEdge { edge: String },
}

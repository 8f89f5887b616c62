mod builders;
mod error;
mod graph;
mod graph_mapping;
mod mapping;
mod path;

pub use builders::{make_deletion_graph, make_region_graph, make_str_graph, RegionFeature};
pub use error::{Error, ParseError, Result, ValidationError};
pub use graph::{Graph, Node, NodeId};
pub use graph_mapping::GraphMapping;
pub use mapping::{parse_operations, Mapping, Operation, OperationKind};
pub use path::GraphPath;

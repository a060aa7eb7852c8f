//! Query compilation and pagination for list endpoints.
//!
//! A list request flows through [`QueryCompiler::compile`] into a
//! [`CompiledQuery`], which [`ResultPaginator`] runs against a
//! [`DocumentStore`](crate::store::DocumentStore). Nothing here logs or
//! touches the transport layer.

pub mod compiler;
pub mod error;
pub mod filter_order;
pub mod filter_where;
pub mod paginate;
pub mod types;

pub use compiler::{QueryCompiler, QueryDefaults};
pub use error::{validate_collection, validate_field, QueryError};
pub use filter_order::FilterOrder;
pub use filter_where::{infer_scalar, FilterWhere};
pub use paginate::{populate, Page, PageLink, PageMeta, Pagination, ResultPaginator};
pub use types::{
    is_field_path, is_reserved, Cardinality, CompiledFilter, CompiledQuery, Expansion, FilterOp,
    Operand, PageRequest, Predicate, Projection, RawQuery, SortDirection, SortField, SortSpec,
    DEFAULT_LIMIT, DEFAULT_PAGE, DEFAULT_SORT, ID_FIELD,
};

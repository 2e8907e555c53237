//! List query pipeline: validate, compile filters, paginate.

mod filter;
mod list_query;
mod paging;

pub use filter::create_filter;
pub use list_query::{
    validate_query, validate_query_structure, FilterExpr, FilterValue, ListQuery, Scalar,
    DEFAULT_PAGE, DEFAULT_PER_PAGE, MULTI_FIELD_TEXT_QUERY,
};
pub use paging::{calc_pagination, PagingParams};

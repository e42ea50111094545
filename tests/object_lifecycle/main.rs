mod common;

mod context_scopes;

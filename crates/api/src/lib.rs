//! HTTP API: JSON routes over one shared [`ptar_infra::Warehouse`].

pub mod app;

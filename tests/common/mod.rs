pub(crate) mod failing_db;

pub(crate) mod keys;

pub(crate) mod logging;

pub(crate) mod node;

pub(crate) mod script_app;

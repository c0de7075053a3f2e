pub(crate) const DEFAULT_USER_AGENT: &str =
    concat!("phaseload/", env!("CARGO_PKG_VERSION"));

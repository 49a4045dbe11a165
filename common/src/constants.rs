pub const CLUSTER_PINS_PATH: &str = "/pins";
pub const CLUSTER_ADD_PATH: &str = "/add";
pub const CLUSTER_HEALTH_PATH: &str = "/health";

pub const NODE_CAT_PATH: &str = "/api/v0/cat";
pub const NODE_VERSION_PATH: &str = "/api/v0/version";

/// Multipart field carrying the uploaded file, both inbound and towards the cluster.
pub const FILE_FIELD_NAME: &str = "file";

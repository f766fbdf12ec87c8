//! Default configuration values shared between the provisioner and log shipper
//!
//! The health-check defaults mirror the policy the service has always been
//! deployed with.

/// Default AWS region when neither flag nor environment provide one
pub const DEFAULT_REGION: &str = "us-east-2";

/// Default cluster name
pub const DEFAULT_CLUSTER_NAME: &str = "my-cluster";

/// Default load balancer name
pub const DEFAULT_LOAD_BALANCER_NAME: &str = "my-alb";

/// Default target group name
pub const DEFAULT_TARGET_GROUP_NAME: &str = "my-target-group";

/// Default service name
pub const DEFAULT_SERVICE_NAME: &str = "my-service";

/// Default container name in the task definition
pub const DEFAULT_CONTAINER_NAME: &str = "my-container";

/// Default port the container listens on
pub const DEFAULT_CONTAINER_PORT: u16 = 8080;

/// Default port the load balancer listener accepts traffic on
pub const DEFAULT_LISTENER_PORT: u16 = 80;

/// Default number of service replicas
pub const DEFAULT_DESIRED_COUNT: u32 = 2;

/// Default Fargate task CPU units
pub const DEFAULT_TASK_CPU: &str = "256";

/// Default Fargate task memory (MiB)
pub const DEFAULT_TASK_MEMORY: &str = "512";

/// Default health-check request path
pub const DEFAULT_HEALTH_CHECK_PATH: &str = "/";

/// Default HTTP codes counted as healthy
pub const DEFAULT_HEALTH_CHECK_MATCHER: &str = "200";

/// Default seconds between health checks
pub const DEFAULT_HEALTH_CHECK_INTERVAL: u32 = 30;

/// Default seconds before a health check times out
pub const DEFAULT_HEALTH_CHECK_TIMEOUT: u32 = 5;

/// Default consecutive successes before a target is healthy
pub const DEFAULT_HEALTHY_THRESHOLD: u32 = 3;

/// Default consecutive failures before a target is unhealthy
pub const DEFAULT_UNHEALTHY_THRESHOLD: u32 = 3;

/// Default CloudWatch log group for application logs
pub const DEFAULT_LOG_GROUP: &str = "/stackline/service";

/// Default CloudWatch log stream for application logs
pub const DEFAULT_LOG_STREAM: &str = "app";

/// Default maximum events per log-store call (1 = one call per record)
pub const DEFAULT_MAX_BATCH_SIZE: usize = 1;

/// Default seconds to wait for queued log events on shutdown
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 5;

// Serde default functions for struct field defaults

/// Returns the default cluster name
pub fn default_cluster_name() -> String {
    DEFAULT_CLUSTER_NAME.to_string()
}

/// Returns the default load balancer name
pub fn default_load_balancer_name() -> String {
    DEFAULT_LOAD_BALANCER_NAME.to_string()
}

/// Returns the default target group name
pub fn default_target_group_name() -> String {
    DEFAULT_TARGET_GROUP_NAME.to_string()
}

/// Returns the default service name
pub fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}

/// Returns the default container name
pub fn default_container_name() -> String {
    DEFAULT_CONTAINER_NAME.to_string()
}

/// Returns the default container port
pub fn default_container_port() -> u16 {
    DEFAULT_CONTAINER_PORT
}

/// Returns the default listener port
pub fn default_listener_port() -> u16 {
    DEFAULT_LISTENER_PORT
}

/// Returns the default replica count
pub fn default_desired_count() -> u32 {
    DEFAULT_DESIRED_COUNT
}

/// Returns the default task CPU units
pub fn default_task_cpu() -> String {
    DEFAULT_TASK_CPU.to_string()
}

/// Returns the default task memory
pub fn default_task_memory() -> String {
    DEFAULT_TASK_MEMORY.to_string()
}

/// Returns the default region
pub fn default_region() -> String {
    DEFAULT_REGION.to_string()
}

/// Returns the default log group
pub fn default_log_group() -> String {
    DEFAULT_LOG_GROUP.to_string()
}

/// Returns the default log stream
pub fn default_log_stream() -> String {
    DEFAULT_LOG_STREAM.to_string()
}

/// Returns the default batch size
pub fn default_max_batch_size() -> usize {
    DEFAULT_MAX_BATCH_SIZE
}

/// Returns the default shutdown timeout
pub fn default_shutdown_timeout_secs() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

/// Load balancers are public-facing unless declared otherwise
pub fn default_external() -> bool {
    true
}

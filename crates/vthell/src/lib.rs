pub mod api;
pub mod config;
pub mod error;
pub mod feed;
pub mod model;
pub mod records;
pub mod registry;
pub mod stream;

pub use api::{ApiClient, RecordsSnapshot};
pub use config::{default_config_path, load_config, Config};
pub use error::{ConfigError, RequestError, Result, StreamError, ValidationError, VthellError};
pub use feed::{FeedEvent, JobFeed};
pub use model::{Job, JobStatus, JobUpdate, SchedulerRule, SchedulerRuleBase, SchedulerRuleType};
pub use records::{RecordsState, TreeNode, TreeStats};
pub use registry::{JobRegistry, SchedulerRegistry};
pub use stream::{EventStreamClient, Frame};

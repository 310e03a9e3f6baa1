mod commit;
pub mod gateway;
mod index;
mod push;
pub mod repo;

pub use gateway::{GitGateway, REMOTE, VersionControl};
pub use repo::{RepoLayout, discover, is_repository, relative_to_workdir, state_dir};

pub mod cli;
pub mod fixtures;
pub mod github;
pub mod issues;
pub mod labels;
pub mod migrator;
pub mod milestones;
pub mod pipeline;
pub mod projects;
pub mod rate;
pub mod releases;
pub mod transform;
pub mod users;

pub mod health;
pub mod link;
pub mod ls;
pub mod reconcile;
pub mod rm;
pub mod serve;
pub mod stats;
pub mod upload;
pub mod version;

crate::command_enum! {
    (Serve, serve::Serve),
    (Upload, upload::Upload),
    (Ls, ls::Ls),
    (Rm, rm::Rm),
    (Stats, stats::Stats),
    (Link, link::Link),
    (Reconcile, reconcile::Reconcile),
    (Health, health::Health),
    (Version, version::Version),
}

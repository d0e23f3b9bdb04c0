//! Property tests for the sidecar metadata round-trip law:
//! `save -> load` must yield a record equal to the original in every
//! defined field, and every strategy tag must round-trip through the
//! stored JSON string form.
//!
//! Run with: cargo test --package repocache-core --test metadata_properties

#![allow(clippy::unwrap_used, clippy::expect_used)]

use proptest::prelude::*;

use repocache_core::identity::RepoId;
use repocache_core::metadata::{HostKind, Metadata};
use repocache_core::strategy::Strategy;

fn strategy_strategy() -> impl Strategy<Value = Strategy> {
    prop_oneof![
        Just(Strategy::Full),
        Just(Strategy::Shallow),
        Just(Strategy::Treeless),
        Just(Strategy::Blobless),
        Just(Strategy::Auto),
    ]
}

fn host_kind_strategy() -> impl Strategy<Value = HostKind> {
    prop_oneof![Just(HostKind::Github), Just(HostKind::Unknown)]
}

fn metadata_strategy() -> impl Strategy<Value = Metadata> {
    (
        "[a-z]{3,10}",
        proptest::option::of("[a-z]{3,10}"),
        strategy_strategy(),
        host_kind_strategy(),
        0i64..2_000_000_000,
        0i64..2_000_000_000,
        0i64..2_000_000_000,
        0i64..1_000_000_000,
        0i64..1000,
        any::<bool>(),
        any::<bool>(),
        any::<bool>(),
        proptest::option::of("[a-z]{3,10}"),
        proptest::option::of("[a-z]{3,10}"),
    )
        .prop_map(
            |(
                owner,
                fork_owner,
                strategy,
                host_kind,
                created_time,
                last_sync_time,
                last_access_time,
                cache_size,
                ref_count,
                is_fork_needed,
                is_private_fork,
                has_submodules,
                default_branch,
                fork_organization,
            )| {
                let id = RepoId::new("github.com", owner, "repo").unwrap();
                let mut metadata = Metadata::create(
                    &id,
                    "https://github.com/octocat/Hello-World.git",
                    strategy,
                    created_time,
                );
                metadata.fork_url = fork_owner.map(|o| format!("https://github.com/{o}/repo.git"));
                metadata.host_kind = host_kind;
                metadata.last_sync_time = last_sync_time;
                metadata.last_access_time = last_access_time;
                metadata.cache_size = cache_size;
                metadata.ref_count = ref_count;
                metadata.is_fork_needed = is_fork_needed;
                metadata.is_private_fork = is_private_fork;
                metadata.has_submodules = has_submodules;
                metadata.default_branch = default_branch;
                metadata.fork_organization = fork_organization;
                metadata
            },
        )
}

proptest! {
    #![proptest_config(ProptestConfig { cases: 48, ..ProptestConfig::default() })]

    #[test]
    fn save_then_load_round_trips_every_field(metadata in metadata_strategy()) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let dir = tempfile::tempdir().unwrap();
            repocache_core::metadata::save(dir.path(), &metadata).await.unwrap();
            let loaded = repocache_core::metadata::load(dir.path()).await.unwrap();
            prop_assert_eq!(loaded, metadata);
            Ok(())
        })?;
    }

    #[test]
    fn strategy_tag_round_trips_through_its_stored_string(strategy in strategy_strategy()) {
        let rendered = strategy.to_string();
        let parsed = Strategy::parse_stored(&rendered, std::path::PathBuf::new()).unwrap();
        prop_assert_eq!(parsed, strategy);
    }
}

use tracing::{debug, warn};

use crate::cli::UserPair;
use crate::github::GithubClient;
use crate::rate::RateBudget;

/// Source-to-destination handle pairs, resolved once per run and lent
/// read-only to every transform stage.
///
/// Pairs are held longest-source-first so that a handle which prefixes
/// another (`al` vs `alice`) can never shadow the longer match during
/// literal substitution.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct IdentityMap {
    pairs: Vec<(String, String)>,
}

impl IdentityMap {
    pub fn from_pairs(mut pairs: Vec<(String, String)>) -> Self {
        pairs.sort_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
        IdentityMap { pairs }
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Resolve the configured user pairs against both endpoints.
///
/// A pair whose source or destination handle cannot be found is dropped
/// with a warning; mentions of it are simply left unmapped. Resolution
/// failure is never fatal to the run.
pub async fn resolve(
    pairs: &[UserPair],
    source: &GithubClient,
    destination: &GithubClient,
) -> IdentityMap {
    let mut budget = RateBudget::standard();
    let mut resolved = Vec::new();

    for pair in pairs {
        budget.acquire().await;
        let source_user = match source.get_user(&pair.source).await {
            Ok(user) => user,
            Err(error) => {
                warn!(
                    handle = %pair.source,
                    base_url = %source.base_url(),
                    %error,
                    "could not resolve source user, mentions stay unmapped"
                );
                continue;
            }
        };

        budget.acquire().await;
        let destination_user = match destination.get_user(&pair.destination).await {
            Ok(user) => user,
            Err(error) => {
                warn!(
                    handle = %pair.destination,
                    base_url = %destination.base_url(),
                    %error,
                    "could not resolve destination user, mentions stay unmapped"
                );
                continue;
            }
        };

        debug!(
            source = %source_user.login,
            destination = %destination_user.login,
            "resolved identity pair"
        );
        resolved.push((source_user.login, destination_user.login));
    }

    IdentityMap::from_pairs(resolved)
}

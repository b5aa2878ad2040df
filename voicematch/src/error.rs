use thiserror::Error;

/// Failure that aborts a matching call.
///
/// Per-fragment embedding failures and empty index results are not errors;
/// they only skip the fragment.
#[derive(Error, Debug)]
pub enum MatchError {
    #[error("voicematch: index query failed for fragment {fragment:?}: {source}")]
    Index {
        fragment: String,
        #[source]
        source: cuncun_vecstore::VecError,
    },
}

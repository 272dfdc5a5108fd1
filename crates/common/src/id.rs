//! ID and business code generation utilities.

use std::fmt;
use std::sync::Arc;

use rand::Rng;
use ulid::Ulid;

/// Uppercase base36 alphabet used for business codes.
const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Alphabet for temporary passwords (no look-alike characters).
const PASSWORD_ALPHABET: &[u8] = b"abcdefghjkmnpqrstuvwxyzABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Kind of human-facing business code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CodeKind {
    /// `ENR-XXXXXXXX`
    EnrollmentRequest,
    /// `PAY-XXXXXXXX`
    Payment,
    /// `SUB-XXXXXXXXXX`
    Subscription,
    /// `PROM-XXXXXXXX`
    Promotion,
    /// `PREG-XXXXXXXXXX`
    ParentRegistration,
}

impl CodeKind {
    /// Code prefix including the trailing dash.
    #[must_use]
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::EnrollmentRequest => "ENR-",
            Self::Payment => "PAY-",
            Self::Subscription => "SUB-",
            Self::Promotion => "PROM-",
            Self::ParentRegistration => "PREG-",
        }
    }

    /// Number of random characters after the prefix.
    #[must_use]
    pub const fn random_len(self) -> usize {
        match self {
            Self::EnrollmentRequest | Self::Payment | Self::Promotion => 8,
            Self::Subscription | Self::ParentRegistration => 10,
        }
    }

    /// Check whether `code` is well-formed for this kind.
    #[must_use]
    pub fn matches(self, code: &str) -> bool {
        code.strip_prefix(self.prefix()).is_some_and(|body| {
            body.len() == self.random_len()
                && body.bytes().all(|b| BASE36_UPPER.contains(&b))
        })
    }
}

impl fmt::Display for CodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EnrollmentRequest => "enrollment request",
            Self::Payment => "payment",
            Self::Subscription => "subscription",
            Self::Promotion => "promotion",
            Self::ParentRegistration => "parent registration",
        };
        f.write_str(name)
    }
}

/// Source of random code bodies.
///
/// Production uses [`RandomCodeSource`]; tests can script the sequence to
/// force collisions.
pub trait CodeSource: Send + Sync {
    /// Produce `len` uppercase base36 characters.
    fn next_body(&self, len: usize) -> String;
}

/// Thread-local RNG backed code source.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeSource;

impl CodeSource for RandomCodeSource {
    fn next_body(&self, len: usize) -> String {
        let mut rng = rand::thread_rng();
        (0..len)
            .map(|_| BASE36_UPPER[rng.gen_range(0..BASE36_UPPER.len())] as char)
            .collect()
    }
}

/// ID generator for entities and business codes.
#[derive(Clone)]
pub struct IdGenerator {
    source: Arc<dyn CodeSource>,
}

impl fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdGenerator").finish_non_exhaustive()
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    /// Create a new ID generator backed by the thread RNG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            source: Arc::new(RandomCodeSource),
        }
    }

    /// Create an ID generator with a custom code source.
    #[must_use]
    pub fn with_source(source: Arc<dyn CodeSource>) -> Self {
        Self { source }
    }

    /// Generate a new ULID-based entity ID.
    ///
    /// ULIDs are lexicographically sortable, which keeps `ORDER BY id`
    /// equivalent to creation order.
    #[must_use]
    pub fn generate(&self) -> String {
        Ulid::new().to_string().to_lowercase()
    }

    /// Generate a prefixed business code such as `ENR-7K2M9QXA`.
    #[must_use]
    pub fn generate_code(&self, kind: CodeKind) -> String {
        format!(
            "{}{}",
            kind.prefix(),
            self.source.next_body(kind.random_len())
        )
    }

    /// Generate a temporary password for a provisioned account.
    #[must_use]
    pub fn generate_temporary_password(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..12)
            .map(|_| PASSWORD_ALPHABET[rng.gen_range(0..PASSWORD_ALPHABET.len())] as char)
            .collect()
    }
}

/// What kind of discovery an identifier calls for.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum LookupKind {
    /// A bare domain: site discovery.
    Site {
        /// The hosted domain.
        domain: String,
    },
    /// A claimed identifier URL: user discovery.
    User {
        /// Host part of the claimed identifier.
        domain: String,
        /// The full claimed identifier.
        claimed_id: String,
    },
}

impl LookupKind {
    /// Classifies `identifier`.
    ///
    /// An identifier of the shape `<scheme>://<host>/<path>` is a claimed
    /// identifier; anything else, including a URL without a path separator,
    /// is treated as a domain.
    pub fn classify(identifier: &str) -> Self {
        let user = identifier.split_once("://").and_then(|(_, rest)| {
            let (host, _) = rest.split_once('/')?;
            Some(Self::User {
                domain: host.to_owned(),
                claimed_id: identifier.to_owned(),
            })
        });

        user.unwrap_or_else(|| Self::Site {
            domain: identifier.to_owned(),
        })
    }

    /// The domain whose host-meta starts the lookup.
    pub fn domain(&self) -> &str {
        match self {
            Self::Site { domain } | Self::User { domain, .. } => domain,
        }
    }

    /// Returns `true` for user discovery.
    pub fn is_user(&self) -> bool {
        matches!(self, Self::User { .. })
    }
}

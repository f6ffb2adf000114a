//! Per-host layout rules
//!
//! Each code-hosting site lays out import paths differently. The rules are
//! kept as data so adding a host never touches the resolver logic.

/// How the author of a package is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorRule {
    /// The second path segment (`host/{author}/...`)
    Segment,
    /// A single-author host
    Fixed(&'static str),
    /// The second segment with its leading `~` stripped, when it has one
    Tilde,
    /// The first path segment, i.e. the host itself
    Host,
}

/// How the project of a package is derived
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectRule {
    /// The path segment at this zero-based index
    Segment(usize),
    /// A host that serves exactly one project
    Fixed(&'static str),
    /// `host/~owner/project` or `host/project`
    Tilde,
}

/// Layout rule for one host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostRule {
    pub host: &'static str,
    pub author: AuthorRule,
    pub project: ProjectRule,
}

/// Known hosts and their layouts
pub const HOST_RULES: &[HostRule] = &[
    HostRule {
        host: "github.com",
        author: AuthorRule::Segment,
        project: ProjectRule::Segment(2),
    },
    HostRule {
        host: "bitbucket.org",
        author: AuthorRule::Segment,
        project: ProjectRule::Segment(2),
    },
    HostRule {
        host: "code.google.com",
        author: AuthorRule::Host,
        project: ProjectRule::Segment(2),
    },
    HostRule {
        host: "labix.org",
        author: AuthorRule::Host,
        project: ProjectRule::Segment(2),
    },
    HostRule {
        host: "llamaslayers.net",
        author: AuthorRule::Fixed("Nightgunner5"),
        project: ProjectRule::Segment(1),
    },
    HostRule {
        host: "bazil.org",
        author: AuthorRule::Host,
        project: ProjectRule::Segment(1),
    },
    HostRule {
        host: "golanger.com",
        author: AuthorRule::Host,
        project: ProjectRule::Fixed("golangers"),
    },
    HostRule {
        host: "cgl.tideland.biz",
        author: AuthorRule::Host,
        project: ProjectRule::Fixed("tcgl"),
    },
    HostRule {
        host: "launchpad.net",
        author: AuthorRule::Tilde,
        project: ProjectRule::Tilde,
    },
];

/// Looks up the rule for the first segment of an import path
pub fn rule_for(host: &str) -> Option<&'static HostRule> {
    HOST_RULES.iter().find(|rule| rule.host == host)
}

//! Recipient Resolver.
//!
//! Turns campaign configuration (manual phone list or group reference) into
//! the canonical, deduplicated, ordered recipient list for one run. Manual
//! lists are validated fail-closed: one bad line rejects the whole
//! submission, with every offending line reported by number.

use regex::Regex;

use crate::common::error::{LineError, ResolveError};
use crate::config::types::Settings;
use crate::gateway::Gateway;

/// Domain suffix of a canonical recipient address.
pub const ADDRESS_SUFFIX: &str = "@s.whatsapp.net";

/// Minimum accepted length of a manual recipient line.
const MIN_LINE_LEN: usize = 10;

/// Ordered, deduplicated canonical recipient addresses for one run.
///
/// Immutable after resolution; re-derived fresh on the next run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipientSet(Vec<String>);

impl RecipientSet {
    fn from_addresses(addresses: impl IntoIterator<Item = String>) -> Self {
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::new();
        for address in addresses {
            if seen.insert(address.clone()) {
                unique.push(address);
            }
        }
        Self(unique)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Result of recipient resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub recipients: RecipientSet,
    /// Group subject, when group mode was used.
    pub group_subject: Option<String>,
}

/// Validate a manual recipient line list.
///
/// Every line must look like a phone number (digits with optional `+` prefix
/// and space/dot/dash/paren separators) of at least 10 characters, or already
/// be a canonical address. Any invalid line rejects the entire submission.
pub fn validate_recipient_lines(lines: &[String]) -> Result<(), ResolveError> {
    let pattern = Regex::new(r"^\+?[0-9][0-9 .\-()]*$").expect("recipient pattern is valid");

    let mut errors = Vec::new();
    for (i, raw) in lines.iter().enumerate() {
        let line = raw.trim();

        // Already-canonical addresses pass through untouched
        if line.ends_with(ADDRESS_SUFFIX) {
            continue;
        }

        if line.len() < MIN_LINE_LEN {
            errors.push(LineError {
                line: i + 1,
                value: raw.clone(),
                reason: format!("shorter than {} characters", MIN_LINE_LEN),
            });
            continue;
        }
        if !pattern.is_match(line) {
            errors.push(LineError {
                line: i + 1,
                value: raw.clone(),
                reason: "not a phone number (digits and separators only)".to_string(),
            });
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ResolveError::InvalidLines(errors))
    }
}

/// Normalize a phone number into a canonical address.
///
/// A value already in canonical form passes through unchanged. Otherwise all
/// non-digits (including a leading `+`) are stripped, the default country
/// prefix is prepended when the number does not already carry it and has at
/// least 10 digits, and the address domain suffix is appended.
pub fn canonicalize(raw: &str, default_country_code: &str) -> String {
    let raw = raw.trim();
    if raw.ends_with(ADDRESS_SUFFIX) {
        return raw.to_string();
    }

    let mut digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    if !digits.starts_with(default_country_code) && digits.len() >= 10 {
        digits = format!("{}{}", default_country_code, digits);
    }

    format!("{}{}", digits, ADDRESS_SUFFIX)
}

/// Resolve a manual line list into a recipient set.
pub fn resolve_manual(
    lines: &[String],
    default_country_code: &str,
) -> Result<RecipientSet, ResolveError> {
    validate_recipient_lines(lines)?;

    let set = RecipientSet::from_addresses(
        lines.iter().map(|line| canonicalize(line, default_country_code)),
    );
    if set.is_empty() {
        return Err(ResolveError::EmptyList);
    }
    Ok(set)
}

/// Resolve a group reference through the gateway's roster lookup.
///
/// Member addresses are used directly, without reformatting. A lookup
/// failure aborts resolution; it is never treated as zero recipients.
pub async fn resolve_group(
    gateway: &dyn Gateway,
    group_jid: &str,
) -> Result<(RecipientSet, String), ResolveError> {
    let roster = gateway
        .group_roster(group_jid)
        .await
        .map_err(ResolveError::RosterLookup)?;

    let set = RecipientSet::from_addresses(roster.members.iter().cloned());
    if set.is_empty() {
        return Err(ResolveError::EmptyList);
    }
    Ok((set, roster.subject))
}

/// Resolve the recipient set for one run.
///
/// Group mode takes precedence over the stored manual list when flagged
/// active with a configured group reference.
pub async fn resolve(
    gateway: &dyn Gateway,
    settings: &Settings,
    manual_recipients: &[String],
) -> Result<Resolved, ResolveError> {
    if settings.use_group {
        let group_jid = settings
            .group_jid
            .as_deref()
            .filter(|jid| !jid.is_empty())
            .ok_or(ResolveError::MissingGroup)?;
        let (recipients, subject) = resolve_group(gateway, group_jid).await?;
        return Ok(Resolved {
            recipients,
            group_subject: Some(subject),
        });
    }

    let recipients = resolve_manual(manual_recipients, &settings.default_country_code)?;
    Ok(Resolved {
        recipients,
        group_subject: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    use crate::common::error::GatewayError;
    use crate::config::types::{
        DelayBounds, MentionMode, MessageSelection, SelectionMode, Settings,
    };
    use crate::gateway::types::{GroupRoster, MessageContent};

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn settings(use_group: bool, group_jid: Option<&str>) -> Settings {
        Settings {
            message_selection: MessageSelection {
                mode: SelectionMode::Random,
                fixed_index: 0,
            },
            mention_mode: MentionMode::Grouped,
            use_group,
            group_jid: group_jid.map(|s| s.to_string()),
            mention_inside_group: false,
            delay: DelayBounds { min: 1, max: 2 },
            default_country_code: "55".to_string(),
        }
    }

    struct RosterGateway {
        roster: Result<GroupRoster, ()>,
    }

    #[async_trait]
    impl Gateway for RosterGateway {
        async fn post_status(
            &self,
            _content: &MessageContent,
            _recipients: &[String],
        ) -> Result<(), GatewayError> {
            unreachable!("resolver never sends");
        }

        async fn send_status_mentions(
            &self,
            _content: &MessageContent,
            _recipients: &[String],
        ) -> Result<(), GatewayError> {
            unreachable!("resolver never sends");
        }

        async fn send_group_message(
            &self,
            _group_jid: &str,
            _content: &MessageContent,
            _mentions: &[String],
        ) -> Result<(), GatewayError> {
            unreachable!("resolver never sends");
        }

        async fn group_roster(&self, group_jid: &str) -> Result<GroupRoster, GatewayError> {
            match &self.roster {
                Ok(roster) => Ok(roster.clone()),
                Err(()) => Err(GatewayError::RosterLookupFailed {
                    group: group_jid.to_string(),
                    message: "not a participant".to_string(),
                }),
            }
        }

        async fn disconnect(&self) -> Result<(), GatewayError> {
            Ok(())
        }

        async fn logout(&self) -> Result<(), GatewayError> {
            Ok(())
        }
    }

    #[test]
    fn test_canonicalize_prepends_default_prefix() {
        assert_eq!(
            canonicalize("81234567890", "55"),
            "5581234567890@s.whatsapp.net"
        );
    }

    #[test]
    fn test_canonicalize_keeps_existing_prefix() {
        assert_eq!(
            canonicalize("5511987654321", "55"),
            "5511987654321@s.whatsapp.net"
        );
    }

    #[test]
    fn test_canonicalize_strips_separators_and_plus() {
        assert_eq!(
            canonicalize("+55 (11) 98765-4321", "55"),
            "5511987654321@s.whatsapp.net"
        );
    }

    #[test]
    fn test_canonicalize_passthrough_for_canonical_address() {
        assert_eq!(
            canonicalize("5511987654321@s.whatsapp.net", "55"),
            "5511987654321@s.whatsapp.net"
        );
    }

    #[test]
    fn test_canonicalize_short_number_gets_no_prefix() {
        // Fewer than 10 digits: no country prefix is assumed
        assert_eq!(canonicalize("123456789", "55"), "123456789@s.whatsapp.net");
    }

    #[test]
    fn test_validate_all_valid() {
        let lines = strings(&["+55 11 98765-4321", "5511912345678", "81234567890"]);
        assert!(validate_recipient_lines(&lines).is_ok());
    }

    #[test]
    fn test_validate_rejects_whole_list_with_line_number() {
        let lines = strings(&["5511987654321", "not-a-number", "5511912345678"]);
        match validate_recipient_lines(&lines) {
            Err(ResolveError::InvalidLines(errors)) => {
                assert_eq!(errors.len(), 1);
                assert_eq!(errors[0].line, 2);
                assert_eq!(errors[0].value, "not-a-number");
            }
            other => panic!("expected InvalidLines, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_rejects_short_lines() {
        let lines = strings(&["12345"]);
        match validate_recipient_lines(&lines) {
            Err(ResolveError::InvalidLines(errors)) => {
                assert_eq!(errors[0].line, 1);
                assert!(errors[0].reason.contains("10"));
            }
            other => panic!("expected InvalidLines, got {:?}", other),
        }
    }

    #[test]
    fn test_resolve_manual_preserves_order_and_dedupes() {
        let lines = strings(&[
            "5511987654321",
            "5511912345678",
            "+55 11 98765-4321", // duplicate of the first after normalization
        ]);
        let set = resolve_manual(&lines, "55").unwrap();
        assert_eq!(
            set.as_slice(),
            &[
                "5511987654321@s.whatsapp.net".to_string(),
                "5511912345678@s.whatsapp.net".to_string(),
            ]
        );
    }

    #[test]
    fn test_resolve_manual_count_matches_valid_input() {
        let lines: Vec<String> = (0..7).map(|i| format!("551198765432{}", i)).collect();
        let set = resolve_manual(&lines, "55").unwrap();
        assert_eq!(set.len(), 7);
    }

    #[tokio::test]
    async fn test_group_mode_takes_precedence() {
        let gateway = RosterGateway {
            roster: Ok(GroupRoster {
                subject: "Launch Team".to_string(),
                members: strings(&[
                    "111@s.whatsapp.net",
                    "222@s.whatsapp.net",
                    "111@s.whatsapp.net",
                ]),
            }),
        };

        let resolved = resolve(
            &gateway,
            &settings(true, Some("12036302@g.us")),
            &strings(&["5511987654321"]),
        )
        .await
        .unwrap();

        assert_eq!(resolved.group_subject.as_deref(), Some("Launch Team"));
        // Roster members are used directly and deduplicated
        assert_eq!(
            resolved.recipients.as_slice(),
            &[
                "111@s.whatsapp.net".to_string(),
                "222@s.whatsapp.net".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_group_lookup_failure_is_surfaced() {
        let gateway = RosterGateway { roster: Err(()) };

        let result = resolve(
            &gateway,
            &settings(true, Some("12036302@g.us")),
            &strings(&["5511987654321"]),
        )
        .await;

        assert!(matches!(result, Err(ResolveError::RosterLookup(_))));
    }

    #[tokio::test]
    async fn test_group_mode_without_jid_fails() {
        let gateway = RosterGateway { roster: Err(()) };
        let result = resolve(&gateway, &settings(true, None), &[]).await;
        assert!(matches!(result, Err(ResolveError::MissingGroup)));
    }
}

//! Component and modal identifiers, decoded once into a typed [`Action`].
//!
//! Wire form is `tag:field[:field]`, at most 100 characters:
//!
//! | tag      | fields           | origin                          |
//! |----------|------------------|---------------------------------|
//! | `sel`    | owner            | product select menu             |
//! | `ok`     | owner            | "confirm selection" button      |
//! | `cancel` | owner            | "cancel" button                 |
//! | `qty`    | owner            | quantity form                   |
//! | `accept` | order number     | staff accept button             |
//! | `reject` | order number     | staff reject button             |
//! | `reason` | order number     | reject reason form              |
//! | `coin`   | owner, side      | coin duel buttons               |

use std::fmt;
use std::str::FromStr;

use crate::coinflip::CoinSide;
use crate::order::OrderNumber;

const SEP: char = ':';
pub const MAX_ID_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Select { owner: String },
    Confirm { owner: String },
    Cancel { owner: String },
    SubmitQuantities { owner: String },
    Accept { order: OrderNumber },
    Reject { order: OrderNumber },
    RejectReason { order: OrderNumber },
    CoinCall { owner: String, side: CoinSide },
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ActionError {
    #[error("empty identifier")]
    Empty,
    #[error("identifier longer than {MAX_ID_LEN} characters")]
    TooLong,
    #[error("unknown action tag `{0}`")]
    UnknownTag(String),
    #[error("`{tag}` identifier is missing its {field}")]
    Missing { tag: &'static str, field: &'static str },
    #[error("`{tag}` identifier has an invalid {field}: `{value}`")]
    Invalid {
        tag: &'static str,
        field: &'static str,
        value: String,
    },
    #[error("`{0}` identifier has trailing fields")]
    Trailing(&'static str),
}

impl Action {
    pub fn tag(&self) -> &'static str {
        match self {
            Action::Select { .. } => "sel",
            Action::Confirm { .. } => "ok",
            Action::Cancel { .. } => "cancel",
            Action::SubmitQuantities { .. } => "qty",
            Action::Accept { .. } => "accept",
            Action::Reject { .. } => "reject",
            Action::RejectReason { .. } => "reason",
            Action::CoinCall { .. } => "coin",
        }
    }

    pub fn encode(&self) -> String {
        let tag = self.tag();
        match self {
            Action::Select { owner }
            | Action::Confirm { owner }
            | Action::Cancel { owner }
            | Action::SubmitQuantities { owner } => format!("{tag}{SEP}{owner}"),
            Action::Accept { order } | Action::Reject { order } | Action::RejectReason { order } => {
                format!("{tag}{SEP}{order}")
            }
            Action::CoinCall { owner, side } => format!("{tag}{SEP}{owner}{SEP}{}", side.as_str()),
        }
    }

    pub fn decode(id: &str) -> Result<Self, ActionError> {
        if id.is_empty() {
            return Err(ActionError::Empty);
        }
        if id.len() > MAX_ID_LEN {
            return Err(ActionError::TooLong);
        }
        let mut parts = id.split(SEP);
        let tag = parts.next().unwrap_or_default();
        let action = match tag {
            "sel" => Action::Select { owner: owner(&mut parts, "sel")? },
            "ok" => Action::Confirm { owner: owner(&mut parts, "ok")? },
            "cancel" => Action::Cancel { owner: owner(&mut parts, "cancel")? },
            "qty" => Action::SubmitQuantities { owner: owner(&mut parts, "qty")? },
            "accept" => Action::Accept { order: order(&mut parts, "accept")? },
            "reject" => Action::Reject { order: order(&mut parts, "reject")? },
            "reason" => Action::RejectReason { order: order(&mut parts, "reason")? },
            "coin" => {
                let owner = owner(&mut parts, "coin")?;
                let raw = parts.next().ok_or(ActionError::Missing { tag: "coin", field: "side" })?;
                let side = CoinSide::parse(raw).ok_or_else(|| ActionError::Invalid {
                    tag: "coin",
                    field: "side",
                    value: raw.to_string(),
                })?;
                Action::CoinCall { owner, side }
            }
            other => return Err(ActionError::UnknownTag(other.to_string())),
        };
        if parts.next().is_some() {
            return Err(ActionError::Trailing(action.tag()));
        }
        Ok(action)
    }
}

fn owner<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    tag: &'static str,
) -> Result<String, ActionError> {
    let raw = parts.next().ok_or(ActionError::Missing { tag, field: "owner" })?;
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ActionError::Invalid {
            tag,
            field: "owner",
            value: raw.to_string(),
        });
    }
    Ok(raw.to_string())
}

fn order<'a>(
    parts: &mut impl Iterator<Item = &'a str>,
    tag: &'static str,
) -> Result<OrderNumber, ActionError> {
    let raw = parts.next().ok_or(ActionError::Missing { tag, field: "order number" })?;
    raw.parse().map_err(|_| ActionError::Invalid {
        tag,
        field: "order number",
        value: raw.to_string(),
    })
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Action {
    type Err = ActionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::decode(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_every_tag() {
        let owner = "123456789012345678".to_string();
        let cases = [
            (format!("sel:{owner}"), Action::Select { owner: owner.clone() }),
            (format!("ok:{owner}"), Action::Confirm { owner: owner.clone() }),
            (format!("cancel:{owner}"), Action::Cancel { owner: owner.clone() }),
            (format!("qty:{owner}"), Action::SubmitQuantities { owner: owner.clone() }),
            ("accept:12345".to_string(), Action::Accept { order: OrderNumber(12345) }),
            ("reject:12345".to_string(), Action::Reject { order: OrderNumber(12345) }),
            ("reason:12345".to_string(), Action::RejectReason { order: OrderNumber(12345) }),
            (
                format!("coin:{owner}:heads"),
                Action::CoinCall { owner: owner.clone(), side: CoinSide::Heads },
            ),
        ];
        for (wire, expected) in cases {
            assert_eq!(Action::decode(&wire).unwrap(), expected, "{wire}");
            assert_eq!(expected.encode(), wire);
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        assert_eq!(Action::decode(""), Err(ActionError::Empty));
        assert_eq!(Action::decode("buy:1"), Err(ActionError::UnknownTag("buy".into())));
        assert_eq!(
            Action::decode("sel"),
            Err(ActionError::Missing { tag: "sel", field: "owner" })
        );
        assert!(matches!(Action::decode("sel:abc"), Err(ActionError::Invalid { .. })));
        assert!(matches!(Action::decode("accept:12x"), Err(ActionError::Invalid { .. })));
        assert!(matches!(Action::decode("coin:1:edge"), Err(ActionError::Invalid { .. })));
        assert_eq!(Action::decode("accept:1:2"), Err(ActionError::Trailing("accept")));
        assert_eq!(Action::decode(&"1".repeat(101)), Err(ActionError::TooLong));
    }

    #[test]
    fn parses_via_fromstr() {
        let a: Action = "reject:55555".parse().unwrap();
        assert_eq!(a, Action::Reject { order: OrderNumber(55555) });
        assert_eq!(a.to_string(), "reject:55555");
    }
}

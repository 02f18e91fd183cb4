//! Decode an incoming [`Event`] once into a [`Route`].

use weinbot_sdk::client::CommandSpec;
use weinbot_sdk::event::{Event, InteractionContext};

use crate::action::{Action, ActionError};

/// Control characters accepted in front of a trigger name.
const TRIGGER_PREFIXES: [char; 2] = ['!', '/'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Start the wine order flow.
    Order,
    /// Flip a coin right away.
    CoinFlip,
    /// Call heads or tails, reveal after a delay.
    CoinDuel,
}

const TRIGGER_TABLE: &[(&str, Trigger, &str)] = &[
    ("bestellen", Trigger::Order, "Wein bestellen"),
    ("münze", Trigger::CoinFlip, "Wirf eine Münze"),
    ("muenze", Trigger::CoinFlip, "Wirf eine Münze"),
    ("kopfoderzahl", Trigger::CoinDuel, "Kopf oder Zahl – rate den Münzwurf"),
];

#[derive(Debug, Clone)]
pub struct Triggers {
    case_insensitive: bool,
}

impl Triggers {
    pub fn new(case_insensitive: bool) -> Self {
        Self { case_insensitive }
    }

    pub fn match_name(&self, raw: &str) -> Option<Trigger> {
        let name = raw.trim().trim_start_matches(TRIGGER_PREFIXES);
        TRIGGER_TABLE
            .iter()
            .find(|(literal, _, _)| {
                if self.case_insensitive {
                    name.to_lowercase() == *literal
                } else {
                    name == *literal
                }
            })
            .map(|(_, trigger, _)| *trigger)
    }

    /// Application commands to register at startup.
    pub fn command_specs(&self) -> Vec<CommandSpec> {
        TRIGGER_TABLE
            .iter()
            .map(|(name, _, description)| CommandSpec::chat_input(*name, *description))
            .collect()
    }
}

/// What came with an action besides its identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    None,
    /// Chosen select-menu values.
    Values(Vec<String>),
    /// Submitted form fields, in form order.
    Fields(Vec<(String, String)>),
}

#[derive(Debug, Clone)]
pub enum Route {
    Ping,
    Trigger {
        ctx: InteractionContext,
        trigger: Trigger,
    },
    Action {
        ctx: InteractionContext,
        action: Action,
        input: Input,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error("unknown command `{0}`")]
    UnknownCommand(String),
    #[error("bad interaction id: {0}")]
    BadIdentifier(#[from] ActionError),
}

pub fn route(event: Event, triggers: &Triggers) -> Result<Route, RouteError> {
    match event {
        Event::Ping => Ok(Route::Ping),
        Event::Command { ctx, name } => {
            let trigger = triggers
                .match_name(&name)
                .ok_or(RouteError::UnknownCommand(name))?;
            Ok(Route::Trigger { ctx, trigger })
        }
        Event::Component {
            ctx,
            custom_id,
            values,
        } => {
            let action = Action::decode(&custom_id)?;
            let input = if values.is_empty() {
                Input::None
            } else {
                Input::Values(values)
            };
            Ok(Route::Action { ctx, action, input })
        }
        Event::ModalSubmit {
            ctx,
            custom_id,
            fields,
        } => {
            let action = Action::decode(&custom_id)?;
            Ok(Route::Action {
                ctx,
                action,
                input: Input::Fields(fields),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::order::OrderNumber;
    use weinbot_sdk::event::Actor;

    fn ctx() -> InteractionContext {
        InteractionContext {
            interaction_id: "1".into(),
            token: "tok".into(),
            channel_id: Some("orders".into()),
            guild_id: Some("g".into()),
            user: Actor {
                id: "42".into(),
                name: "kunde".into(),
                roles: vec![],
                permissions: 0,
            },
        }
    }

    #[test]
    fn matches_triggers_with_prefixes() {
        let strict = Triggers::new(false);
        assert_eq!(strict.match_name("bestellen"), Some(Trigger::Order));
        assert_eq!(strict.match_name("!bestellen"), Some(Trigger::Order));
        assert_eq!(strict.match_name("/münze"), Some(Trigger::CoinFlip));
        assert_eq!(strict.match_name("muenze"), Some(Trigger::CoinFlip));
        assert_eq!(strict.match_name("kopfoderzahl"), Some(Trigger::CoinDuel));
        assert_eq!(strict.match_name("Bestellen"), None);
        assert_eq!(strict.match_name("würfeln"), None);

        let relaxed = Triggers::new(true);
        assert_eq!(relaxed.match_name("!MÜNZE"), Some(Trigger::CoinFlip));
        assert_eq!(relaxed.match_name("Bestellen"), Some(Trigger::Order));
    }

    #[test]
    fn registers_every_trigger_name() {
        let names: Vec<_> = Triggers::new(false)
            .command_specs()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(names, vec!["bestellen", "münze", "muenze", "kopfoderzahl"]);
    }

    #[test]
    fn routes_components_and_modals() {
        let triggers = Triggers::new(false);
        let route_sel = route(
            Event::Component {
                ctx: ctx(),
                custom_id: "sel:42".into(),
                values: vec!["riesling".into()],
            },
            &triggers,
        )
        .unwrap();
        assert!(matches!(
            route_sel,
            Route::Action { action: Action::Select { ref owner }, input: Input::Values(ref v), .. }
                if owner == "42" && v == &vec!["riesling".to_string()]
        ));

        let route_btn = route(
            Event::Component {
                ctx: ctx(),
                custom_id: "accept:12345".into(),
                values: vec![],
            },
            &triggers,
        )
        .unwrap();
        assert!(matches!(
            route_btn,
            Route::Action { action: Action::Accept { order: OrderNumber(12345) }, input: Input::None, .. }
        ));

        let route_modal = route(
            Event::ModalSubmit {
                ctx: ctx(),
                custom_id: "reason:12345".into(),
                fields: vec![("reason".into(), "weg".into())],
            },
            &triggers,
        )
        .unwrap();
        assert!(matches!(route_modal, Route::Action { input: Input::Fields(_), .. }));
    }

    #[test]
    fn unknown_inputs_are_errors() {
        let triggers = Triggers::new(false);
        assert!(matches!(
            route(Event::Command { ctx: ctx(), name: "hilfe".into() }, &triggers),
            Err(RouteError::UnknownCommand(_))
        ));
        assert!(matches!(
            route(
                Event::Component { ctx: ctx(), custom_id: "nope:1".into(), values: vec![] },
                &triggers
            ),
            Err(RouteError::BadIdentifier(ActionError::UnknownTag(_)))
        ));
        assert!(matches!(route(Event::Ping, &triggers), Ok(Route::Ping)));
    }
}

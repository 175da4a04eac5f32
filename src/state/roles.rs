//! Role assignment.
//!
//! Runs once per session, synchronously, when the third member joins:
//!
//! 1. Draw roles according to the session's [`AssignmentPolicy`]
//! 2. Draw two pseudonyms, redrawing the second until it differs
//! 3. Flip a coin for which respondent is the correct reveal answer
//! 4. Tell the Host both pseudonyms and each respondent the other's
//! 5. Enter `InProgress` with the Host to move

use chrono::{DateTime, Utc};

use super::error::SessionError;
use super::notice::{keys, Notice, Text};
use super::participant::{ParticipantId, Role};
use super::phase::{PhaseEvent, SessionPhase};
use super::rng::GameRng;
use super::session::{AssignmentPolicy, Session};
use super::turn::TurnState;
use crate::config::GameConfig;

/// Builds "Adjective Noun" aliases from two word pools.
#[derive(Debug, Clone)]
pub struct PseudonymGenerator {
    adjectives: Vec<String>,
    nouns: Vec<String>,
}

impl PseudonymGenerator {
    pub fn new(adjectives: Vec<String>, nouns: Vec<String>) -> Self {
        Self { adjectives, nouns }
    }

    pub fn from_config(config: &GameConfig) -> Self {
        Self::new(
            config.pseudonym_adjectives.clone(),
            config.pseudonym_nouns.clone(),
        )
    }

    /// Draw one pseudonym.
    pub fn generate(&self, rng: &GameRng) -> String {
        let adjective = rng.pick(&self.adjectives).map(String::as_str).unwrap_or("Nameless");
        let noun = rng.pick(&self.nouns).map(String::as_str).unwrap_or("Stranger");
        format!("{} {}", adjective, noun)
    }

    /// Draw two different pseudonyms.
    ///
    /// The pools must yield at least two distinct names (`GameConfig::validate`
    /// checks this); with a single possible name a numeric suffix separates
    /// the pair instead of redrawing forever.
    pub fn generate_pair(&self, rng: &GameRng) -> (String, String) {
        const MAX_REDRAWS: usize = 64;

        let first = self.generate(rng);
        for _ in 0..MAX_REDRAWS {
            let second = self.generate(rng);
            if second != first {
                return (first, second);
            }
        }

        tracing::warn!("pseudonym pool too small, disambiguating with a suffix");
        let second = format!("{} II", first);
        (first, second)
    }
}

impl Default for PseudonymGenerator {
    fn default() -> Self {
        Self::from_config(&GameConfig::default())
    }
}

/// Assigns roles, pseudonyms and the correct reveal answer.
#[derive(Debug, Clone, Default)]
pub struct RoleAssigner {
    names: PseudonymGenerator,
}

impl RoleAssigner {
    pub fn new(names: PseudonymGenerator) -> Self {
        Self { names }
    }

    /// Assign roles to a full lobby and start the game.
    pub fn assign(&self, session: &mut Session, rng: &GameRng, now: DateTime<Utc>) -> Result<Vec<Notice>, SessionError> {
        if session.phase == SessionPhase::Lobby && session.is_full() {
            session.apply_phase(PhaseEvent::Fill)?;
        }
        if session.phase != SessionPhase::RoleAssignment {
            return Err(SessionError::TargetNotInLobby);
        }

        let (host, knight, knave) =
            Self::draw_roles(session, rng).ok_or(SessionError::TargetNotInLobby)?;
        let (knight_name, knave_name) = self.names.generate_pair(rng);
        let correct = if rng.coin() { knight } else { knave };

        for seat in session.seats_mut() {
            if seat.id() == host {
                seat.role = Role::Host;
                seat.pseudonym = None;
            } else if seat.id() == knight {
                seat.role = Role::Knight;
                seat.pseudonym = Some(knight_name.clone());
            } else if seat.id() == knave {
                seat.role = Role::Knave;
                seat.pseudonym = Some(knave_name.clone());
            }
        }
        session.set_correct_respondent(correct);
        session.turn = TurnState::default();
        session.started_at = Some(now);
        session.last_activity = now;
        session.apply_phase(PhaseEvent::Assigned)?;

        tracing::info!(
            session = %session.id,
            policy = ?session.policy,
            %host,
            "roles assigned, game started"
        );

        // Host hears the pseudonyms in random order so the Knight is not
        // always named first.
        let mut pair = [knight_name.clone(), knave_name.clone()];
        rng.shuffle(&mut pair);
        let [first, second] = pair;

        let mut notices = Vec::new();
        notices.extend(session.notice_to(
            host,
            Text::template(keys::ROLE_HOST, [("first", first), ("second", second)]),
        ));
        notices.extend(session.notice_to(
            knight,
            Text::template(keys::ROLE_KNIGHT, [("partner", knave_name)]),
        ));
        notices.extend(session.notice_to(
            knave,
            Text::template(keys::ROLE_KNAVE, [("partner", knight_name)]),
        ));
        Ok(notices)
    }

    /// Returns (host, knight, knave), `None` unless exactly three are seated.
    fn draw_roles(session: &Session, rng: &GameRng) -> Option<(ParticipantId, ParticipantId, ParticipantId)> {
        let mut members: Vec<ParticipantId> = session.member_ids().collect();
        members.sort();

        match session.policy {
            AssignmentPolicy::Random => {
                rng.shuffle(&mut members);
            }
            AssignmentPolicy::CreatorIsHost => {
                members.retain(|id| *id != session.creator);
                rng.shuffle(&mut members);
                members.insert(0, session.creator);
            }
        }

        match members[..] {
            [host, knight, knave] => Some((host, knight, knave)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::participant::Participant;
    use crate::state::session::SessionId;
    use std::collections::HashMap;

    fn full_session(policy: AssignmentPolicy) -> Session {
        let now = Utc::now();
        let mut s = Session::new(SessionId(1), Participant::new(ParticipantId(1), "U1", "en"), policy, now);
        s.add_member(Participant::new(ParticipantId(2), "U2", "en"), now).unwrap();
        s.add_member(Participant::new(ParticipantId(3), "U3", "ru"), now).unwrap();
        s
    }

    #[test]
    fn test_assign_creator_is_host() {
        let rng = GameRng::seeded(5);
        let assigner = RoleAssigner::default();

        for _ in 0..50 {
            let mut s = full_session(AssignmentPolicy::CreatorIsHost);
            let notices = assigner.assign(&mut s, &rng, Utc::now()).unwrap();

            assert_eq!(s.phase, SessionPhase::InProgress);
            assert_eq!(s.role_of(ParticipantId(1)), Some(Role::Host));
            assert!(s.seat_by_role(Role::Knight).is_some());
            assert!(s.seat_by_role(Role::Knave).is_some());
            assert_eq!(notices.len(), 3);
            assert!(s.correct_respondent().is_some_and(|id| id != ParticipantId(1)));
        }
    }

    #[test]
    fn test_assign_sets_distinct_pseudonyms() {
        let rng = GameRng::seeded(11);
        let assigner = RoleAssigner::default();
        let mut s = full_session(AssignmentPolicy::Random);
        assigner.assign(&mut s, &rng, Utc::now()).unwrap();

        let knight = s.pseudonym_of(Role::Knight).unwrap();
        let knave = s.pseudonym_of(Role::Knave).unwrap();
        assert_ne!(knight, knave);
        assert!(s.seat_by_role(Role::Host).unwrap().pseudonym.is_none());
    }

    #[test]
    fn test_assign_runs_once() {
        let rng = GameRng::seeded(3);
        let assigner = RoleAssigner::default();
        let mut s = full_session(AssignmentPolicy::Random);
        assigner.assign(&mut s, &rng, Utc::now()).unwrap();
        assert!(assigner.assign(&mut s, &rng, Utc::now()).is_err());
    }

    #[test]
    fn test_random_policy_is_uniform() {
        let rng = GameRng::seeded(2024);
        let assigner = RoleAssigner::default();
        let mut counts: HashMap<(ParticipantId, ParticipantId, ParticipantId), usize> = HashMap::new();

        const TRIALS: usize = 6_000;
        for _ in 0..TRIALS {
            let mut s = full_session(AssignmentPolicy::Random);
            assigner.assign(&mut s, &rng, Utc::now()).unwrap();
            let key = (
                s.seat_by_role(Role::Host).unwrap().id(),
                s.seat_by_role(Role::Knight).unwrap().id(),
                s.seat_by_role(Role::Knave).unwrap().id(),
            );
            *counts.entry(key).or_default() += 1;
        }

        // All six bijections appear about equally often (expected 1000 each)
        assert_eq!(counts.len(), 6);
        for (perm, count) in counts {
            assert!((850..1150).contains(&count), "{:?} drawn {} times", perm, count);
        }
    }

    #[test]
    fn test_creator_is_host_split_and_answer_are_fair() {
        let rng = GameRng::seeded(77);
        let assigner = RoleAssigner::default();

        const TRIALS: usize = 4_000;
        let mut second_is_knight = 0;
        let mut knight_is_correct = 0;
        for _ in 0..TRIALS {
            let mut s = full_session(AssignmentPolicy::CreatorIsHost);
            assigner.assign(&mut s, &rng, Utc::now()).unwrap();

            let knight = s.seat_by_role(Role::Knight).unwrap().id();
            if knight == ParticipantId(2) {
                second_is_knight += 1;
            }
            if s.correct_respondent() == Some(knight) {
                knight_is_correct += 1;
            }
        }

        // Expected 2000 each; 1800..2200 is about six standard deviations
        assert!((1800..2200).contains(&second_is_knight), "U2 was Knight {} times", second_is_knight);
        assert!((1800..2200).contains(&knight_is_correct), "Knight was correct {} times", knight_is_correct);
    }

    #[test]
    fn test_notices_name_the_right_pseudonyms() {
        let rng = GameRng::seeded(8);
        let assigner = RoleAssigner::default();
        let mut s = full_session(AssignmentPolicy::CreatorIsHost);
        let notices = assigner.assign(&mut s, &rng, Utc::now()).unwrap();

        let knight = s.seat_by_role(Role::Knight).unwrap();
        let knave = s.seat_by_role(Role::Knave).unwrap();
        let knight_notice = notices.iter().find(|n| n.to == knight.id()).unwrap();
        assert_eq!(
            knight_notice.text,
            Text::template(
                keys::ROLE_KNIGHT,
                [("partner", knave.pseudonym.clone().unwrap())]
            )
        );
        // Russian-speaking member gets a Russian notice
        let u3 = notices.iter().find(|n| n.to == ParticipantId(3)).unwrap();
        assert_eq!(u3.locale, "ru");
    }

    #[test]
    fn test_generate_pair_with_tiny_pool() {
        let rng = GameRng::seeded(1);
        let names = PseudonymGenerator::new(vec!["Red".into()], vec!["Fox".into(), "Owl".into()]);
        for _ in 0..20 {
            let (a, b) = names.generate_pair(&rng);
            assert_ne!(a, b);
        }

        let single = PseudonymGenerator::new(vec!["Red".into()], vec!["Fox".into()]);
        let (a, b) = single.generate_pair(&rng);
        assert_eq!(a, "Red Fox");
        assert_eq!(b, "Red Fox II");
    }
}

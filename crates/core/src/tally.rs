use crate::types::{Ballot, Decision, VoteType};

/// Ballot counts of a voting, split by vote type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub votes_for: u32,
    pub votes_against: u32,
    pub votes_abstain: u32,
}

impl Tally {
    /// Counts the provided ballots in a single pass.
    pub fn count<'a, I>(ballots: I) -> Self
    where
        I: IntoIterator<Item = &'a Ballot>,
    {
        let mut tally = Self::default();
        for ballot in ballots {
            tally.record(ballot.vote);
        }
        tally
    }

    pub fn record(&mut self, vote: VoteType) {
        match vote {
            VoteType::For => self.votes_for += 1,
            VoteType::Against => self.votes_against += 1,
            VoteType::Abstain => self.votes_abstain += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.votes_for + self.votes_against + self.votes_abstain
    }

    /// A topic is accepted when it collects more votes for than against.
    /// Abstentions are recorded but never tip the outcome.
    pub fn decision(&self) -> Decision {
        Decision::from_accepted(self.votes_for > self.votes_against)
    }
}

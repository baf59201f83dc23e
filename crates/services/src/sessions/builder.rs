use rand::Rng;
use rand::rng;
use rand::seq::SliceRandom;

use exam_core::model::{QuestionRecord, SessionConfig};

/// Derives the working set of a session from a bank and a clamped configuration.
///
/// Order of operations is fixed: subset slice, optional shuffle, truncate.
#[derive(Debug, Clone, Copy)]
pub struct SessionBuilder {
    config: SessionConfig,
}

impl SessionBuilder {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Build the working set, shuffling with the thread-local generator.
    ///
    /// An empty bank yields an empty working set.
    #[must_use]
    pub fn build(&self, bank: &[QuestionRecord]) -> Vec<QuestionRecord> {
        self.build_with_rng(bank, &mut rng())
    }

    /// Build the working set with a caller-supplied generator.
    #[must_use]
    pub fn build_with_rng<R: Rng + ?Sized>(
        &self,
        bank: &[QuestionRecord],
        rng: &mut R,
    ) -> Vec<QuestionRecord> {
        let pool = match self.config.subset_bounds() {
            Some((start, end)) => {
                let end = end.min(bank.len());
                let start = start.min(end);
                &bank[start..end]
            }
            None => bank,
        };

        let mut working_set = pool.to_vec();
        if self.config.random_order {
            working_set.as_mut_slice().shuffle(rng);
        }
        working_set.truncate(self.config.question_limit());
        working_set
    }
}

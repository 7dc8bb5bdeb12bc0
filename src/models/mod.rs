mod interaction;
mod tip;

pub use interaction::{Interaction, InteractionType};
pub use tip::{
    Language, LikeOutcome, NewTip, Situation, Tip, TipCollection, TipEntry, TipFilter, TipKey,
    TipRow, TipUpdate,
};

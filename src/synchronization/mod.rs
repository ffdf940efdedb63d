mod completion;

pub use completion::{CompletionBarrier, Signal};

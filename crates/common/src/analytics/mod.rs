mod posthog;

pub use posthog::*;

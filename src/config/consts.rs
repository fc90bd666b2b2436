/// Logger label used for aggregated actor output when none is configured
pub const DEFAULT_LOGGER: &str = "the_relay";
/// Prefix for stages connected without an explicit name (`stage-0`, `stage-1`, ...)
pub const DEFAULT_STAGE_PREFIX: &str = "stage";
/// Channel capacity meaning "unbounded"
pub const UNBOUNDED: usize = 0;

/// Options shared by every chaos sub-command.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Pick a single random victim out of the matching targets on each tick.
    pub random: bool,
    /// Log planned chaos without touching any container or cluster object.
    ///
    /// The hold timers still run, so timing matches a real run.
    pub dry_run: bool,
    /// Raw recurring interval (`""` runs the command once).
    pub interval: String,
}

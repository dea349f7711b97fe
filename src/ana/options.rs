//! The configuration mask (§3 "Configuration mask"): the set of options
//! recognised per-graph, with a program-wide default a graph can defer to.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct DisambiguatorOptions: u16 {
        /// Oracle always returns `may`. Program-wide only in the reference
        /// IR, but nothing stops a host from also setting it per graph;
        /// `Program::get_graph_options` only ever reads the program-wide
        /// copy of this bit through `no_alias_analysis`'s global check in
        /// `ana::oracle`, so a per-graph copy is simply inert.
        const NO_ALIAS_ANALYSIS = 1 << 0;
        /// The "Armageddon switch": oracle always returns `no`.
        const NO_ALIAS = 1 << 1;
        const TYPE_BASED = 1 << 2;
        const BYTE_TYPE_MAY_ALIAS = 1 << 3;
        const NO_ALIAS_ARGS = 1 << 4;
        const NO_ALIAS_ARGS_GLOBAL = 1 << 5;
        /// Per-graph mask defers to the program-wide mask. Cleared by
        /// `Program::set_graph_options` (§6), which always clears it on the
        /// value it's given, matching `set_irg_memory_disambiguator_options`
        /// masking off `aa_opt_inherited` unconditionally.
        const INHERITED = 1 << 6;
    }
}

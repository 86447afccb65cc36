mod market;
mod region;
mod results;
mod tax_pack;

pub use market::{
    FULL_YEAR_MONTHS, HistoricalDataset, HistoricalReturns, HistoricalStatistics,
    MIN_HISTORICAL_POINTS, ReturnStrategy,
};
pub use region::{AUTONOMOUS_COMMUNITIES, Region, TaxSystem};
pub use results::{
    BacktestDiagnostics, Convergence, GenerationMethod, PercentileBands, PercentileSummary,
    RetirementTaxContext, ReturnDistribution, SavingsTaxDetail, SimulationResult, WealthTaxDetail,
    WealthTaxes, WindowOutcome, WindowSpan,
};
pub use tax_pack::{
    BonusMode, Bracket, Irpf, IrpfForal, IrpfGeneral, IrpfSavings, IsgfRules, PackMeta,
    RegionMap, SavingsRegime, SourceRef, TaxPack, Wealth, WealthBonus, WealthRegime, WealthRules,
};

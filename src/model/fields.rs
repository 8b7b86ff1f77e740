//! Well-known field names referenced by the join, grouping and redaction logic.

pub const ANALYSIS_ID: &str = "analysis_id";
pub const ANALYZED_SAMPLE_ID: &str = "analyzed_sample_id";
pub const MATCHED_SAMPLE_ID: &str = "matched_sample_id";
pub const OBSERVATION_ID: &str = "observation_id";
pub const MUTATION_ID: &str = "mutation_id";
pub const MARKING: &str = "marking";
pub const SV_ID: &str = "sv_id";
pub const PLACEMENT: &str = "placement";
pub const SUBMITTED_DONOR_ID: &str = "donor_id";

pub const PROJECT_ID: &str = "_project_id";
pub const DONOR_ID: &str = "_donor_id";
pub const SAMPLE_ID: &str = "_sample_id";
pub const MATCHED_SAMPLE_SURROGATE_ID: &str = "_matched_sample_id";

pub const CONSEQUENCE_ARRAY: &str = "consequence";
pub const OBSERVATION_ARRAY: &str = "observation";

/// Fields describing the mutation itself rather than one analysis of it.
///
/// They are lifted to the top level of an occurrence; every other primary
/// field stays with its observation.
pub const MUTATION_FIELDS: &[&str] = &[
    MUTATION_ID,
    "mutation_type",
    "chromosome",
    "chromosome_start",
    "chromosome_end",
    "chromosome_strand",
    "reference_genome_allele",
    "mutated_from_allele",
    "mutated_to_allele",
    "assembly_version",
    PROJECT_ID,
];

/// Primary fields withheld from open-access output unless configured otherwise.
pub const DEFAULT_CONTROLLED_FIELDS: &[&str] = &[
    "control_genotype",
    "tumour_genotype",
    "expressed_allele",
    "quality_score",
    "probability",
    "total_read_count",
    "mutant_allele_read_count",
];

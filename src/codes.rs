//! # Registry of air-interface convolutional codes
//!
//! Descriptors for the convolutional codes of GSM (3GPP TS 45.003), GPRS, WiMAX (IEEE 802.16) and
//! LTE (3GPP TS 36.212), plus an IEEE 802.11 code punctured to rate 3/4. The GSM set covers the
//! AMR speech channels up to rate 1/4: TCH/AFS 12.2 to 5.9 and TCH/AHS 7.95 to 4.75. The
//! descriptors are plain constants; [`CODES`] lists them with display names, and [`by_name`]
//! looks one up.
//!
//! # Examples
//!
//! ```
//! use trellis_fec::codes;
//!
//! let named = codes::by_name("afs-7.95").unwrap();
//! assert_eq!(named.name, "GSM TCH/AFS 7.95");
//! assert_eq!(named.code.len, 165);
//! assert_eq!(named.code.encoded_len(), 448);
//! ```

use crate::{CodeDescriptor, Puncture, Termination};

/// GSM xCCH: `N = 2`, `K = 5`, non-recursive, flushed, not punctured
pub const GSM_XCCH: CodeDescriptor = gsm_half_rate(224);

/// GPRS CS2: `N = 2`, `K = 5`, non-recursive, flushed, not punctured
pub const GPRS_CS2: CodeDescriptor = gsm_half_rate(290);

/// GPRS CS3: `N = 2`, `K = 5`, non-recursive, flushed, not punctured
pub const GPRS_CS3: CodeDescriptor = gsm_half_rate(334);

/// GSM RACH: `N = 2`, `K = 5`, non-recursive, flushed, not punctured
pub const GSM_RACH: CodeDescriptor = gsm_half_rate(14);

/// GSM SCH: `N = 2`, `K = 5`, non-recursive, flushed, not punctured
pub const GSM_SCH: CodeDescriptor = gsm_half_rate(35);

/// GSM TCH/FR: `N = 2`, `K = 5`, non-recursive, flushed, not punctured
pub const GSM_TCH_FR: CodeDescriptor = gsm_half_rate(185);

/// GSM TCH/AFS 12.2: `N = 2`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AFS_12_2: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 5,
    len: 250,
    generators: &[0o23, 0o33],
    feedback: Some(0o23),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AFS_12_2_PUNCTURED)),
};

/// GSM TCH/AFS 10.2: `N = 3`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AFS_10_2: CodeDescriptor = CodeDescriptor {
    n: 3,
    k: 5,
    len: 210,
    generators: &[0o33, 0o25, 0o37],
    feedback: Some(0o37),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AFS_10_2_PUNCTURED)),
};

/// GSM TCH/AFS 7.95: `N = 3`, `K = 7`, recursive, flushed, punctured
pub const GSM_TCH_AFS_7_95: CodeDescriptor = CodeDescriptor {
    n: 3,
    k: 7,
    len: 165,
    generators: &[0o133, 0o145, 0o175],
    feedback: Some(0o133),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AFS_7_95_PUNCTURED)),
};

/// GSM TCH/AFS 7.4: `N = 3`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AFS_7_4: CodeDescriptor = CodeDescriptor {
    n: 3,
    k: 5,
    len: 154,
    generators: &[0o33, 0o25, 0o37],
    feedback: Some(0o37),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AFS_7_4_PUNCTURED)),
};

/// GSM TCH/AFS 6.7: `N = 4`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AFS_6_7: CodeDescriptor = CodeDescriptor {
    n: 4,
    k: 5,
    len: 140,
    generators: &[0o33, 0o25, 0o37, 0o37],
    feedback: Some(0o37),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AFS_6_7_PUNCTURED)),
};

/// GSM TCH/AFS 5.9: `N = 4`, `K = 7`, recursive, flushed, punctured
pub const GSM_TCH_AFS_5_9: CodeDescriptor = CodeDescriptor {
    n: 4,
    k: 7,
    len: 124,
    generators: &[0o133, 0o145, 0o175, 0o175],
    feedback: Some(0o175),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AFS_5_9_PUNCTURED)),
};

/// GSM TCH/AHS 7.95: `N = 2`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AHS_7_95: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 5,
    len: 129,
    generators: &[0o23, 0o33],
    feedback: Some(0o23),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AHS_7_95_PUNCTURED)),
};

/// GSM TCH/AHS 7.4: `N = 2`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AHS_7_4: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 5,
    len: 126,
    generators: &[0o23, 0o33],
    feedback: Some(0o23),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AHS_7_4_PUNCTURED)),
};

/// GSM TCH/AHS 6.7: `N = 2`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AHS_6_7: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 5,
    len: 116,
    generators: &[0o23, 0o33],
    feedback: Some(0o23),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AHS_6_7_PUNCTURED)),
};

/// GSM TCH/AHS 5.9: `N = 2`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AHS_5_9: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 5,
    len: 108,
    generators: &[0o23, 0o33],
    feedback: Some(0o23),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AHS_5_9_PUNCTURED)),
};

/// GSM TCH/AHS 5.15: `N = 3`, `K = 5`, recursive, flushed, punctured
pub const GSM_TCH_AHS_5_15: CodeDescriptor = CodeDescriptor {
    n: 3,
    k: 5,
    len: 97,
    generators: &[0o33, 0o25, 0o37],
    feedback: Some(0o37),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AHS_5_15_PUNCTURED)),
};

/// GSM TCH/AHS 4.75: `N = 3`, `K = 7`, recursive, flushed, punctured
pub const GSM_TCH_AHS_4_75: CodeDescriptor = CodeDescriptor {
    n: 3,
    k: 7,
    len: 89,
    generators: &[0o133, 0o145, 0o175],
    feedback: Some(0o175),
    termination: Termination::Flushed,
    puncture: Some(Puncture::Positions(&AHS_4_75_PUNCTURED)),
};

/// WiMAX FCH: `N = 2`, `K = 7`, non-recursive, tail-biting, not punctured
pub const WIMAX_FCH: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 7,
    len: 48,
    generators: &[0o171, 0o133],
    feedback: None,
    termination: Termination::TailBiting,
    puncture: None,
};

/// LTE PBCH: `N = 3`, `K = 7`, non-recursive, tail-biting, not punctured
pub const LTE_PBCH: CodeDescriptor = CodeDescriptor {
    n: 3,
    k: 7,
    len: 512,
    generators: &[0o133, 0o171, 0o165],
    feedback: None,
    termination: Termination::TailBiting,
    puncture: None,
};

/// IEEE 802.11 rate 3/4: `N = 2`, `K = 7`, non-recursive, flushed, periodically punctured
pub const IEEE_802_11_R34: CodeDescriptor = CodeDescriptor {
    n: 2,
    k: 7,
    len: 216,
    generators: &[0o133, 0o171],
    feedback: None,
    termination: Termination::Flushed,
    puncture: Some(Puncture::Periodic(&[true, true, true, false, false, true])),
};

/// Named entry of the registry
#[derive(Clone, Eq, PartialEq, Debug, Copy)]
pub struct NamedCode {
    /// Short lowercase key for lookups and command lines
    pub key: &'static str,
    /// Display name
    pub name: &'static str,
    /// Standard defining the code
    pub standard: &'static str,
    /// Code descriptor
    pub code: CodeDescriptor,
}

/// All registered codes
pub static CODES: &[NamedCode] = &[
    NamedCode {
        key: "xcch",
        name: "GSM xCCH",
        standard: "3GPP TS 45.003",
        code: GSM_XCCH,
    },
    NamedCode {
        key: "cs2",
        name: "GPRS CS2",
        standard: "3GPP TS 45.003",
        code: GPRS_CS2,
    },
    NamedCode {
        key: "cs3",
        name: "GPRS CS3",
        standard: "3GPP TS 45.003",
        code: GPRS_CS3,
    },
    NamedCode {
        key: "rach",
        name: "GSM RACH",
        standard: "3GPP TS 45.003",
        code: GSM_RACH,
    },
    NamedCode {
        key: "sch",
        name: "GSM SCH",
        standard: "3GPP TS 45.003",
        code: GSM_SCH,
    },
    NamedCode {
        key: "tch-fr",
        name: "GSM TCH/FR",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_FR,
    },
    NamedCode {
        key: "afs-12.2",
        name: "GSM TCH/AFS 12.2",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AFS_12_2,
    },
    NamedCode {
        key: "afs-10.2",
        name: "GSM TCH/AFS 10.2",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AFS_10_2,
    },
    NamedCode {
        key: "afs-7.95",
        name: "GSM TCH/AFS 7.95",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AFS_7_95,
    },
    NamedCode {
        key: "afs-7.4",
        name: "GSM TCH/AFS 7.4",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AFS_7_4,
    },
    NamedCode {
        key: "afs-6.7",
        name: "GSM TCH/AFS 6.7",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AFS_6_7,
    },
    NamedCode {
        key: "afs-5.9",
        name: "GSM TCH/AFS 5.9",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AFS_5_9,
    },
    NamedCode {
        key: "ahs-7.95",
        name: "GSM TCH/AHS 7.95",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AHS_7_95,
    },
    NamedCode {
        key: "ahs-7.4",
        name: "GSM TCH/AHS 7.4",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AHS_7_4,
    },
    NamedCode {
        key: "ahs-6.7",
        name: "GSM TCH/AHS 6.7",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AHS_6_7,
    },
    NamedCode {
        key: "ahs-5.9",
        name: "GSM TCH/AHS 5.9",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AHS_5_9,
    },
    NamedCode {
        key: "ahs-5.15",
        name: "GSM TCH/AHS 5.15",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AHS_5_15,
    },
    NamedCode {
        key: "ahs-4.75",
        name: "GSM TCH/AHS 4.75",
        standard: "3GPP TS 45.003",
        code: GSM_TCH_AHS_4_75,
    },
    NamedCode {
        key: "wimax-fch",
        name: "WiMAX FCH",
        standard: "IEEE 802.16",
        code: WIMAX_FCH,
    },
    NamedCode {
        key: "lte-pbch",
        name: "LTE PBCH",
        standard: "3GPP TS 36.212",
        code: LTE_PBCH,
    },
    NamedCode {
        key: "wifi-r34",
        name: "IEEE 802.11 R=3/4",
        standard: "IEEE 802.11",
        code: IEEE_802_11_R34,
    },
];

/// Returns the registered code with given key or display name (case-insensitive).
#[must_use]
pub fn by_name(name: &str) -> Option<&'static NamedCode> {
    CODES
        .iter()
        .find(|named| named.key.eq_ignore_ascii_case(name) || named.name.eq_ignore_ascii_case(name))
}

/// Returns the GSM rate-1/2 code (`G0 = 1 + D^3 + D^4`, `G1 = 1 + D + D^3 + D^4`) for given
/// block length.
const fn gsm_half_rate(len: usize) -> CodeDescriptor {
    CodeDescriptor {
        n: 2,
        k: 5,
        len,
        generators: &[0o23, 0o33],
        feedback: None,
        termination: Termination::Flushed,
        puncture: None,
    }
}

/// Punctured positions of TCH/AFS 12.2 (508 raw outputs, 448 transmitted)
const AFS_12_2_PUNCTURED: [usize; 60] = [
    321, 325, 329, 333, 337, 341, 345, 349, 353, 357, 361, 363, 365, 369, 373, 377, 379, 381, 385,
    389, 393, 395, 397, 401, 405, 409, 411, 413, 417, 421, 425, 427, 429, 433, 437, 441, 443, 445,
    449, 453, 457, 459, 461, 465, 469, 473, 475, 477, 481, 485, 489, 491, 493, 495, 497, 499, 501,
    503, 505, 507,
];

/// Punctured positions of TCH/AFS 7.95 (513 raw outputs, 448 transmitted)
const AFS_7_95_PUNCTURED: [usize; 65] = [
    1, 2, 4, 5, 8, 22, 70, 118, 166, 214, 262, 310, 317, 319, 325, 332, 334, 341, 343, 349, 356,
    358, 365, 367, 373, 380, 382, 385, 389, 391, 397, 404, 406, 409, 413, 415, 421, 428, 430, 433,
    437, 439, 445, 452, 454, 457, 461, 463, 469, 476, 478, 481, 485, 487, 491, 493, 500, 502, 503,
    505, 506, 509, 510, 511, 512,
];

/// Punctured positions of TCH/AFS 10.2 (642 raw outputs, 448 transmitted)
const AFS_10_2_PUNCTURED: [usize; 194] = [
    1, 4, 7, 10, 16, 19, 22, 28, 31, 34, 40, 43, 46, 52, 55, 58, 64, 67, 70, 76, 79, 82, 88, 91, 94,
    100, 103, 106, 112, 115, 118, 124, 127, 130, 136, 139, 142, 148, 151, 154, 160, 163, 166, 172,
    175, 178, 184, 187, 190, 196, 199, 202, 208, 211, 214, 220, 223, 226, 232, 235, 238, 244, 247,
    250, 256, 259, 262, 265, 268, 271, 274, 277, 280, 283, 286, 289, 292, 295, 298, 301, 304, 307,
    310, 313, 316, 319, 322, 325, 328, 331, 334, 337, 340, 343, 346, 349, 352, 355, 358, 361, 364,
    367, 370, 373, 376, 379, 382, 385, 388, 391, 394, 397, 400, 403, 406, 409, 412, 415, 418, 421,
    424, 427, 430, 433, 436, 439, 442, 445, 448, 451, 454, 457, 460, 463, 466, 469, 472, 475, 478,
    481, 484, 487, 490, 493, 496, 499, 502, 505, 508, 511, 514, 517, 520, 523, 526, 529, 532, 535,
    538, 541, 544, 547, 550, 553, 556, 559, 562, 565, 568, 571, 574, 577, 580, 583, 586, 589, 592,
    595, 598, 601, 604, 607, 610, 613, 616, 619, 622, 625, 628, 631, 634, 637, 640, 641,
];

/// Punctured positions of TCH/AFS 7.4 (474 raw outputs, 448 transmitted)
const AFS_7_4_PUNCTURED: [usize; 26] = [
    0, 355, 361, 367, 373, 379, 385, 391, 397, 403, 409, 415, 421, 427, 433, 439, 445, 451, 457,
    460, 463, 466, 468, 469, 471, 472,
];

/// Punctured positions of TCH/AFS 6.7 (576 raw outputs, 448 transmitted)
const AFS_6_7_PUNCTURED: [usize; 128] = [
    1, 3, 7, 11, 15, 27, 39, 55, 67, 79, 95, 107, 119, 135, 147, 159, 175, 187, 199, 215, 227, 239,
    255, 267, 279, 287, 291, 295, 299, 303, 307, 311, 315, 319, 323, 327, 331, 335, 339, 343, 347,
    351, 355, 359, 363, 367, 369, 371, 375, 377, 379, 383, 385, 387, 391, 393, 395, 399, 401, 403,
    407, 409, 411, 415, 417, 419, 423, 425, 427, 431, 433, 435, 439, 441, 443, 447, 449, 451, 455,
    457, 459, 463, 465, 467, 471, 473, 475, 479, 481, 483, 487, 489, 491, 495, 497, 499, 503, 505,
    507, 511, 513, 515, 519, 521, 523, 527, 529, 531, 535, 537, 539, 543, 545, 547, 549, 551, 553,
    555, 557, 559, 561, 563, 565, 567, 569, 571, 573, 575,
];

/// Punctured positions of TCH/AFS 5.9 (520 raw outputs, 448 transmitted)
const AFS_5_9_PUNCTURED: [usize; 72] = [
    0, 1, 3, 5, 7, 11, 15, 31, 47, 63, 79, 95, 111, 127, 143, 159, 175, 191, 207, 223, 239, 255,
    271, 287, 303, 319, 327, 331, 335, 343, 347, 351, 359, 363, 367, 375, 379, 383, 391, 395, 399,
    407, 411, 415, 423, 427, 431, 439, 443, 447, 455, 459, 463, 467, 471, 475, 479, 483, 487, 491,
    495, 499, 503, 507, 509, 511, 512, 513, 515, 516, 517, 519,
];

/// Punctured positions of TCH/AHS 7.95 (266 raw outputs, 188 transmitted)
const AHS_7_95_PUNCTURED: [usize; 78] = [
    1, 3, 5, 7, 11, 15, 19, 23, 27, 31, 35, 43, 47, 51, 55, 59, 63, 67, 71, 79, 83, 87, 91, 95, 99,
    103, 107, 115, 119, 123, 127, 131, 135, 139, 143, 151, 155, 159, 163, 167, 171, 175, 177, 179,
    183, 185, 187, 191, 193, 195, 197, 199, 203, 205, 207, 211, 213, 215, 219, 221, 223, 227, 229,
    231, 233, 235, 239, 241, 243, 247, 249, 251, 255, 257, 259, 261, 263, 265,
];

/// Punctured positions of TCH/AHS 7.4 (260 raw outputs, 196 transmitted)
const AHS_7_4_PUNCTURED: [usize; 64] = [
    1, 3, 7, 11, 19, 23, 27, 35, 39, 43, 51, 55, 59, 67, 71, 75, 83, 87, 91, 99, 103, 107, 115, 119,
    123, 131, 135, 139, 143, 147, 151, 155, 159, 163, 167, 171, 175, 179, 183, 187, 191, 195, 199,
    203, 207, 211, 215, 219, 221, 223, 227, 229, 231, 235, 237, 239, 243, 245, 247, 251, 253, 255,
    257, 259,
];

/// Punctured positions of TCH/AHS 6.7 (240 raw outputs, 200 transmitted)
const AHS_6_7_PUNCTURED: [usize; 40] = [
    1, 3, 9, 19, 29, 39, 49, 59, 69, 79, 89, 99, 109, 119, 129, 139, 149, 159, 167, 169, 177, 179,
    187, 189, 197, 199, 203, 207, 209, 213, 217, 219, 223, 227, 229, 231, 233, 235, 237, 239,
];

/// Punctured positions of TCH/AHS 5.9 (224 raw outputs, 208 transmitted)
const AHS_5_9_PUNCTURED: [usize; 16] = [
    1, 15, 71, 127, 139, 151, 163, 175, 187, 195, 203, 211, 215, 219, 221, 223,
];

/// Punctured positions of TCH/AHS 5.15 (303 raw outputs, 212 transmitted)
const AHS_5_15_PUNCTURED: [usize; 91] = [
    0, 1, 3, 4, 6, 9, 12, 15, 18, 21, 27, 33, 39, 45, 51, 54, 57, 63, 69, 75, 81, 87, 90, 93, 99,
    105, 111, 117, 123, 126, 129, 135, 141, 147, 153, 159, 162, 165, 168, 171, 174, 177, 180, 183,
    186, 189, 192, 195, 198, 201, 204, 207, 210, 213, 216, 219, 222, 225, 228, 231, 234, 237, 240,
    243, 244, 246, 249, 252, 255, 256, 258, 261, 264, 267, 268, 270, 273, 276, 279, 280, 282, 285,
    288, 289, 291, 294, 295, 297, 298, 300, 301,
];

/// Punctured positions of TCH/AHS 4.75 (285 raw outputs, 212 transmitted)
const AHS_4_75_PUNCTURED: [usize; 73] = [
    1, 2, 4, 5, 7, 8, 10, 13, 16, 22, 28, 34, 40, 46, 52, 58, 64, 70, 76, 82, 88, 94, 100, 106, 112,
    118, 124, 130, 136, 142, 148, 151, 154, 160, 163, 166, 172, 175, 178, 184, 187, 190, 196, 199,
    202, 208, 211, 214, 220, 223, 226, 232, 235, 238, 241, 244, 247, 250, 253, 256, 259, 262, 265,
    268, 271, 273, 274, 276, 277, 279, 280, 282, 283,
];
#[cfg(test)]
mod tests_of_codes {
    use super::*;

    #[test]
    fn test_registry_is_valid() {
        for named in CODES {
            assert!(named.code.validate().is_ok(), "{}", named.name);
        }
    }

    #[test]
    fn test_registry_lengths() {
        let expected = [
            ("xcch", 224, 456),
            ("cs2", 290, 588),
            ("cs3", 334, 676),
            ("rach", 14, 36),
            ("sch", 35, 78),
            ("tch-fr", 185, 378),
            ("afs-12.2", 250, 448),
            ("afs-10.2", 210, 448),
            ("afs-7.95", 165, 448),
            ("afs-7.4", 154, 448),
            ("afs-6.7", 140, 448),
            ("afs-5.9", 124, 448),
            ("ahs-7.95", 129, 188),
            ("ahs-7.4", 126, 196),
            ("ahs-6.7", 116, 200),
            ("ahs-5.9", 108, 208),
            ("ahs-5.15", 97, 212),
            ("ahs-4.75", 89, 212),
            ("wimax-fch", 48, 96),
            ("lte-pbch", 512, 1536),
            ("wifi-r34", 216, 296),
        ];
        assert_eq!(CODES.len(), expected.len());
        for (named, (key, len, encoded_len)) in CODES.iter().zip(expected) {
            assert_eq!(named.key, key);
            assert_eq!(named.code.len, len);
            assert_eq!(named.code.encoded_len(), encoded_len);
        }
    }

    #[test]
    fn test_by_name() {
        assert_eq!(by_name("xcch").unwrap().code, GSM_XCCH);
        assert_eq!(by_name("LTE PBCH").unwrap().code, LTE_PBCH);
        assert_eq!(by_name("WIMAX-FCH").unwrap().code, WIMAX_FCH);
        assert_eq!(by_name("GSM TCH/AHS 5.15").unwrap().code, GSM_TCH_AHS_5_15);
        assert!(by_name("afs-4.75").is_none());
    }

    #[test]
    fn test_unique_keys() {
        for (i, first) in CODES.iter().enumerate() {
            assert!(CODES[i + 1 ..].iter().all(|second| second.key != first.key));
        }
    }
}

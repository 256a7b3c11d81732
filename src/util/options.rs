use crate::policy::ZoneType;
use crate::util::constants::DEFAULT_EVICT_RETRIES;
use strum_macros::{Display, EnumString};

/// How a range policy request behaves when checking the range fails part way.
#[derive(Copy, Clone, Debug, PartialEq, Eq, EnumString, Display)]
#[strum(ascii_case_insensitive)]
pub enum RangeApply {
    /// Attach the policy area by area. If a later area fails, the areas before it keep the
    /// new policy.
    BestEffort,
    /// For strict requests that do not move pages, check every page of the range against
    /// the new policy before changing any area.
    ValidateFirst,
}

fn always_valid<T>(_: &T) -> bool {
    true
}

macro_rules! options {
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*,) => [
        options!($($name: $type[$validator] = $default),*);
    ];
    ($($name:ident: $type:ty[$validator:expr] = $default:expr),*) => [
        #[derive(Clone, Debug)]
        pub struct Options {
            $(pub $name: $type),*
        }
        impl Options {
            /// Set an option from its string form. Returns false, leaving the option
            /// unchanged, if the name is unknown or the value cannot be parsed or is invalid.
            pub fn set_from_str(&mut self, s: &str, val: &str) -> bool {
                match s {
                    // Parse the given value from str (by env vars or by the builder) to the right type
                    $(stringify!($name) => if let Ok(ref val) = val.parse::<$type>() {
                        // Validate
                        let validate_fn = $validator;
                        let is_valid = validate_fn(val);
                        if is_valid {
                            // Only set value if valid.
                            self.$name = val.clone();
                        } else {
                            eprintln!("Warn: unable to set {}={:?}. Invalid value. Default value will be used.", s, val);
                        }
                        is_valid
                    } else {
                        eprintln!("Warn: unable to set {}={:?}. Cant parse value. Default value will be used.", s, val);
                        false
                    })*
                    _ => {
                        eprintln!("Warn: unknown option {:?}.", s);
                        false
                    }
                }
            }
        }
        impl Default for Options {
            fn default() -> Self {
                let mut options = Options {
                    $($name: $default),*
                };

                // If we have env vars that start with MEMPOLICY_ and match any option (such as MEMPOLICY_EVICT_RETRIES),
                // we set the option to its value (if it is a valid value). Otherwise, use the default value.
                const PREFIX: &str = "MEMPOLICY_";
                for (key, val) in std::env::vars() {
                    // strip the prefix, and get the lower case string
                    if let Some(rest_of_key) = key.strip_prefix(PREFIX) {
                        let lowercase: &str = &rest_of_key.to_lowercase();
                        match lowercase {
                            $(stringify!($name) => { options.set_from_str(lowercase, &val); },)*
                            _ => {}
                        }
                    }
                }
                options
            }
        }
    ]
}

options! {
    // How many times the scanner tries to evict a page-cache page that violates a policy before giving up.
    evict_retries:  usize      [|v: &usize| *v > 0] = DEFAULT_EVICT_RETRIES,
    // What a strict range request that fails part way leaves behind.
    range_apply:    RangeApply [always_valid]        = RangeApply::BestEffort,
    // The zone requested for replacement pages when moving pages onto policy nodes.
    migrate_zone:   ZoneType   [always_valid]        = ZoneType::HighMem
}

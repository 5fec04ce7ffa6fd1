//! Fixed enumerations a scheme is classified by.
//!
//! Every value travels over the wire and through the database as its label,
//! so each enum knows its exact label set and parses case-sensitively.

/// A closed set of values identified by their labels.
pub trait Labelled: Sized + Copy + 'static {
    fn from_label(label: &str) -> Option<Self>;
    fn expected_labels() -> String;
}

/// Declares a closed set of labelled values.
macro_rules! labelled_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $($variant:ident => $label:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// All values in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $label),+
                }
            }

            pub fn parse(s: &str) -> Option<Self> {
                match s {
                    $($label => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// Accepted labels, for error messages.
            pub fn expected() -> String {
                Self::ALL
                    .iter()
                    .map(|v| v.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        }

        impl Labelled for $name {
            fn from_label(label: &str) -> Option<Self> {
                Self::parse(label)
            }

            fn expected_labels() -> String {
                Self::expected()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl serde::Serialize for $name {
            fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_str())
            }
        }
    };
}

labelled_enum! {
    /// Scheme category.
    Category {
        Agriculture => "Agriculture",
        Education => "Education",
        Healthcare => "Healthcare",
        Employment => "Employment",
        Housing => "Housing",
        WomenEmpowerment => "Women Empowerment",
        YouthDevelopment => "Youth Development",
        SeniorCitizens => "Senior Citizens",
        Disability => "Disability",
        FinancialInclusion => "Financial Inclusion",
        Technology => "Technology",
        Environment => "Environment",
        RuralDevelopment => "Rural Development",
        UrbanDevelopment => "Urban Development",
        Other => "Other",
    }
}

labelled_enum! {
    /// Minimum education an applicant needs; `Any` admits everyone.
    EducationLevel {
        NoEducation => "No Education",
        Primary => "Primary",
        Secondary => "Secondary",
        HigherSecondary => "Higher Secondary",
        Graduate => "Graduate",
        PostGraduate => "Post Graduate",
        Any => "Any",
    }
}

labelled_enum! {
    Gender {
        Male => "Male",
        Female => "Female",
        Any => "Any",
    }
}

labelled_enum! {
    /// Where an applicant lives; `Both` admits everyone.
    Location {
        Rural => "Rural",
        Urban => "Urban",
        Both => "Both",
    }
}

labelled_enum! {
    SchemeStatus {
        Active => "Active",
        Inactive => "Inactive",
        Upcoming => "Upcoming",
        Closed => "Closed",
    }
}

labelled_enum! {
    /// Administrative district a scheme is offered in.
    District {
        AllDistricts => "All Districts",
        Chennai => "Chennai",
        Coimbatore => "Coimbatore",
        Madurai => "Madurai",
        Salem => "Salem",
        Tiruchirappalli => "Tiruchirappalli",
        Vellore => "Vellore",
        Erode => "Erode",
        Tiruppur => "Tiruppur",
        Tirunelveli => "Tirunelveli",
        Thoothukkudi => "Thoothukkudi",
        Dindigul => "Dindigul",
        Thanjavur => "Thanjavur",
        Villupuram => "Villupuram",
        Kanchipuram => "Kanchipuram",
        Cuddalore => "Cuddalore",
        Pudukkottai => "Pudukkottai",
        Sivaganga => "Sivaganga",
        Ramanathapuram => "Ramanathapuram",
        Virudhunagar => "Virudhunagar",
        Karur => "Karur",
        Namakkal => "Namakkal",
        Theni => "Theni",
        Krishnagiri => "Krishnagiri",
        Dharmapuri => "Dharmapuri",
        Tiruvannamalai => "Tiruvannamalai",
        Ariyalur => "Ariyalur",
        Perambalur => "Perambalur",
        Nagapattinam => "Nagapattinam",
        Tiruvarur => "Tiruvarur",
        Nilgiris => "Nilgiris",
        Tenkasi => "Tenkasi",
        Chengalpattu => "Chengalpattu",
        Ranipet => "Ranipet",
        Tirupathur => "Tirupathur",
        Mayiladuthurai => "Mayiladuthurai",
        Kallakurichi => "Kallakurichi",
    }
}

impl Default for EducationLevel {
    fn default() -> Self {
        EducationLevel::Any
    }
}

impl Default for Gender {
    fn default() -> Self {
        Gender::Any
    }
}

impl Default for Location {
    fn default() -> Self {
        Location::Both
    }
}

impl Default for SchemeStatus {
    fn default() -> Self {
        SchemeStatus::Active
    }
}

impl Default for District {
    fn default() -> Self {
        District::AllDistricts
    }
}

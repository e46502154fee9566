use std::sync::LazyLock;

/// Encoding of a raw register value.
///
/// The textual names are the ones used by the established Elster register tables, so that
/// register lists exported by other tools can be read back with [`ValueType::from_name`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::VariantArray,
    strum::IntoStaticStr,
    strum::EnumString,
    strum::Display,
)]
pub enum ValueType {
    /// Signed 16-bit integer.
    #[default]
    #[strum(to_string = "et_default", serialize = "default")]
    Default,
    /// Signed value with one fractional digit (xx.x).
    #[strum(to_string = "et_dec_val", serialize = "dec_val")]
    DecVal,
    /// Signed value with two fractional digits (x.xx).
    #[strum(to_string = "et_cent_val", serialize = "cent_val")]
    CentVal,
    /// Signed value with three fractional digits (x.xxx).
    #[strum(to_string = "et_mil_val", serialize = "mil_val")]
    MilVal,
    #[strum(to_string = "et_byte", serialize = "byte")]
    Byte,
    /// `0x0000` or `0x0001`.
    #[strum(to_string = "et_bool", serialize = "bool")]
    Bool,
    /// `0x0000` or `0x0100`.
    #[strum(to_string = "et_little_bool", serialize = "little_bool")]
    LittleBool,
    #[strum(to_string = "et_double_val", serialize = "double_val")]
    DoubleVal,
    #[strum(to_string = "et_triple_val", serialize = "triple_val")]
    TripleVal,
    #[strum(to_string = "et_little_endian", serialize = "little_endian")]
    LittleEndian,
    /// Operating mode, see [`OPERATING_MODES`].
    #[strum(to_string = "et_betriebsart", serialize = "betriebsart")]
    Betriebsart,
    /// Time of day, hour in the low byte and minute in the high byte.
    #[strum(to_string = "et_zeit", serialize = "zeit")]
    Zeit,
    /// Day in the high byte and month in the low byte.
    #[strum(to_string = "et_datum", serialize = "datum")]
    Datum,
    /// A pair of quarter-hour counts describing a `HH:MM-HH:MM` span.
    #[strum(to_string = "et_time_domain", serialize = "time_domain")]
    TimeDomain,
    #[strum(to_string = "et_dev_nr", serialize = "dev_nr")]
    DevNr,
    /// Error number, see [`ERRORS`].
    #[strum(to_string = "et_err_nr", serialize = "err_nr")]
    ErrNr,
    #[strum(to_string = "et_dev_id", serialize = "dev_id")]
    DevId,
}

impl ValueType {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    /// Accepts both the canonical `et_`-prefixed name and the bare one.
    pub fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

impl serde::Serialize for ValueType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RegisterDescriptor {
    pub name: &'static str,
    pub index: u16,
    pub value_type: ValueType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ErrorDescriptor {
    pub index: u16,
    pub name: &'static str,
}

impl ErrorDescriptor {
    pub fn find(index: u16) -> Option<&'static ErrorDescriptor> {
        ERRORS.iter().find(|e| e.index == index)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OperatingModeDescriptor {
    pub name: &'static str,
    /// Raw register value selecting this mode. The mode number lives in the high byte.
    pub index: u16,
}

impl OperatingModeDescriptor {
    /// Look up a mode by the number carried in the high byte of a register value.
    pub fn by_number(number: u8) -> Option<&'static OperatingModeDescriptor> {
        OPERATING_MODES.get(usize::from(number))
    }
}

/// Reverse lookup from every possible register index to a slot of a register catalog.
///
/// Once built the table is never modified, so a shared reference may be handed to any number of
/// concurrent readers.
pub struct IndexResolver {
    slots: Box<[Option<u16>]>,
}

impl IndexResolver {
    /// Build the table for `catalog`.
    ///
    /// If the catalog lists the same index more than once, the entry that comes last wins.
    pub fn build(catalog: &[RegisterDescriptor]) -> Self {
        let mut slots = vec![None; usize::from(u16::MAX) + 1].into_boxed_slice();
        for (slot, descriptor) in catalog.iter().enumerate() {
            let Ok(slot) = u16::try_from(slot) else {
                tracing::warn!(slot, "register catalog too large, ignoring remaining entries");
                break;
            };
            slots[usize::from(descriptor.index)] = Some(slot);
        }
        Self { slots }
    }

    pub fn resolve(&self, index: u16) -> Option<usize> {
        self.slots[usize::from(index)].map(usize::from)
    }
}

static RESOLVER: LazyLock<IndexResolver> = LazyLock::new(|| IndexResolver::build(REGISTERS));

/// The resolver for [`REGISTERS`], built on first use.
pub fn resolver() -> &'static IndexResolver {
    &RESOLVER
}

/// A slot in [`REGISTERS`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Register(usize);

impl Register {
    pub fn from_index(index: u16) -> Option<Register> {
        resolver().resolve(index).map(Self)
    }

    pub fn from_name(name: &str) -> Option<Register> {
        REGISTERS.iter().position(|r| r.name == name).map(Self)
    }

    pub fn all() -> impl Iterator<Item = Register> {
        (0..REGISTERS.len()).map(Self)
    }

    pub fn slot(&self) -> usize {
        self.0
    }

    pub fn descriptor(&self) -> &'static RegisterDescriptor {
        &REGISTERS[self.0]
    }

    pub fn index(&self) -> u16 {
        self.descriptor().index
    }

    pub fn name(&self) -> &'static str {
        self.descriptor().name
    }

    pub fn value_type(&self) -> ValueType {
        self.descriptor().value_type
    }
}

macro_rules! for_each_register {
    ($m:ident) => {
        $m! {
            0x0001: ErrNr,        "FEHLERMELDUNG";
            0x0002: DecVal,       "KESSELSOLLTEMP";
            0x0003: DecVal,       "SPEICHERSOLLTEMP";
            0x0004: DecVal,       "VORLAUFSOLLTEMP";
            0x0005: DecVal,       "RAUMSOLLTEMP_I";
            0x0006: DecVal,       "RAUMSOLLTEMP_II";
            0x0007: DecVal,       "RAUMSOLLTEMP_III";
            0x0008: DecVal,       "RAUMSOLLTEMP_NACHT";
            0x0009: Zeit,         "UHRZEIT";
            0x000a: Datum,        "DATUM";
            0x000b: DevId,        "GERAETE_ID";
            0x000c: DecVal,       "AUSSENTEMP";
            0x000d: DecVal,       "SAMMLERISTTEMP";
            0x000e: DecVal,       "SPEICHERISTTEMP";
            0x000f: DecVal,       "VORLAUFISTTEMP";
            0x0010: Default,      "GERAETEKONFIGURATION";
            0x0011: DecVal,       "RAUMISTTEMP";
            0x0012: DecVal,       "VERSTELLTE_RAUMSOLLTEMP";
            0x0013: DecVal,       "EINSTELL_SPEICHERSOLLTEMP";
            0x0014: DecVal,       "VERDAMPFERTEMP";
            0x0015: DecVal,       "SAMMLERSOLLTEMP";
            0x0016: DecVal,       "RUECKLAUFISTTEMP";
            0x0017: DecVal,       "SPEICHER_UNTEN_TEMP";
            0x0018: DecVal,       "SOLARZONENTEMP";
            0x0019: DecVal,       "SPEICHER_OBEN_TEMP";
            0x001a: DecVal,       "KOLLEKTORTEMP";
            0x001b: DecVal,       "FESTSTOFFKESSELTEMP";
            0x001c: DecVal,       "MIN_TEMP_KESSEL";
            0x001d: DecVal,       "ANFAHRTEMP";
            0x0020: DecVal,       "MAX_TEMP_KESSEL";
            0x0022: DecVal,       "MAX_TEMP_HZK";
            0x0026: Byte,         "KESSELSTATUS";
            0x0027: DecVal,       "PUMPENDREHZAHL_HEIZEN";
            0x0028: DecVal,       "BRENNERSTARTS";
            0x003a: DecVal,       "PARTYDAUER";
            0x0056: DecVal,       "RAUMEINFLUSS";
            0x0058: Bool,         "MISCHER_ZU";
            0x0059: Bool,         "MISCHER_AUF";
            0x005a: DecVal,       "PUFFERSOLLTEMP";
            0x0061: DevNr,        "FERNBEDIENUNG_NR";
            0x0075: DecVal,       "FEUCHTE";
            0x0076: Bool,         "FREIGABE_HEIZEN";
            0x0077: Bool,         "FREIGABE_KUEHLEN";
            0x010e: CentVal,      "HEIZKURVE";
            0x0110: DecVal,       "HEIZKURVENFUSSPUNKT";
            0x0112: Betriebsart,  "PROGRAMMSCHALTER";
            0x0116: LittleBool,   "SOMMERBETRIEB";
            0x0121: LittleEndian, "WOCHENTAG";
            0x0122: LittleEndian, "TAG";
            0x0123: LittleEndian, "MONAT";
            0x0124: LittleEndian, "JAHR";
            0x0125: LittleEndian, "STUNDE";
            0x0126: LittleEndian, "MINUTE";
            0x0127: LittleEndian, "SEKUNDE";
            0x0199: Default,      "SOFTWARE_NUMMER";
            0x019a: Default,      "SOFTWARE_VERSION";
            0x01a4: Byte,         "VERDICHTER_STATUS";
            0x01d6: DecVal,       "WPVORLAUFIST";
            0x01d7: DecVal,       "WPRUECKLAUFIST";
            0x01e6: MilVal,       "VOLUMENSTROM";
            0x0263: DevNr,        "BUSKENNUNG";
            0x0264: LittleBool,   "WARMWASSER_VORRANG";
            0x04a2: DecVal,       "HEISSGAS_TEMP";
            0x04a3: DecVal,       "HOCHDRUCK";
            0x04a4: DecVal,       "NIEDERDRUCK";
            0x091a: DoubleVal,    "WW_SUM";
            0x091b: DoubleVal,    "HEIZ_SUM";
            0x091c: Default,      "WW_SUM_KWH";
            0x091d: Default,      "WW_SUM_MWH";
            0x0920: Default,      "HEIZ_SUM_KWH";
            0x0921: Default,      "HEIZ_SUM_MWH";
            0x0930: TripleVal,    "ELEKTRISCHE_LEISTUNG";
            0x1410: TimeDomain,   "HEIZPROG_1_MO";
            0x1411: TimeDomain,   "HEIZPROG_1_DI";
            0x1412: TimeDomain,   "HEIZPROG_1_MI";
            0x1413: TimeDomain,   "HEIZPROG_1_DO";
            0x1414: TimeDomain,   "HEIZPROG_1_FR";
            0x1415: TimeDomain,   "HEIZPROG_1_SA";
            0x1416: TimeDomain,   "HEIZPROG_1_SO";
            0x1710: TimeDomain,   "W_WASSERPROG_1_MO";
            0x1711: TimeDomain,   "W_WASSERPROG_1_DI";
            0x1712: TimeDomain,   "W_WASSERPROG_1_MI";
            0x1713: TimeDomain,   "W_WASSERPROG_1_DO";
            0x1714: TimeDomain,   "W_WASSERPROG_1_FR";
            0x1715: TimeDomain,   "W_WASSERPROG_1_SA";
            0x1716: TimeDomain,   "W_WASSERPROG_1_SO";
            0x4ec7: DecVal,       "RAUM_IST_TEMPERATUR";
            0x4ec8: DecVal,       "RAUM_IST_FEUCHTE";
            0x4ece: DecVal,       "RAUM_SOLL_TEMPERATUR";
            0x4ee0: DecVal,       "RAUM_TAUPUNKT_TEMPERATUR";
            0x4f07: Bool,         "KUEHLEN_AKTIVIERT";
            0xc0ee: DecVal,       "PASSIVKUEHLUNG_TEMP";
            0xfdad: Default,      "ZUGANGSCODE";
        }
    };
}

macro_rules! make_lists {
    ($($index: literal: $vt: ident, $name: literal;)+) => {
        pub static REGISTERS: &[RegisterDescriptor] = &[
            $(RegisterDescriptor { name: $name, index: $index, value_type: ValueType::$vt }),*
        ];
    };
}

for_each_register!(make_lists);

const _: () = {
    let mut index = 1;
    while index < REGISTERS.len() {
        if REGISTERS[index].index <= REGISTERS[index - 1].index {
            panic!("REGISTERS is not sorted (or has duplicate indices)!");
        }
        index += 1;
    }
};

pub static ERRORS: &[ErrorDescriptor] = &[
    ErrorDescriptor { index: 0x0002, name: "Schuetz klebt" },
    ErrorDescriptor { index: 0x0003, name: "ERR HD-SENSOR" },
    ErrorDescriptor { index: 0x0004, name: "Hochdruck" },
    ErrorDescriptor { index: 0x0005, name: "Verdampferfuehler" },
    ErrorDescriptor { index: 0x0006, name: "Relaistreiber" },
    ErrorDescriptor { index: 0x0007, name: "Relaispegel" },
    ErrorDescriptor { index: 0x0008, name: "Hexschalter" },
    ErrorDescriptor { index: 0x0009, name: "Drehzahl Luefter" },
    ErrorDescriptor { index: 0x000a, name: "Lueftertreiber" },
    ErrorDescriptor { index: 0x000b, name: "Reset Baustein" },
    ErrorDescriptor { index: 0x000c, name: "ND" },
    ErrorDescriptor { index: 0x000d, name: "ROM" },
    ErrorDescriptor { index: 0x000e, name: "QUELLEN MINTEMP" },
    ErrorDescriptor { index: 0x0010, name: "Abtauen" },
    ErrorDescriptor { index: 0x0012, name: "ERR T-HEI IWS" },
    ErrorDescriptor { index: 0x0017, name: "ERR T-FRO IWS" },
    ErrorDescriptor { index: 0x001a, name: "Niederdruck" },
    ErrorDescriptor { index: 0x001b, name: "ERR ND-DRUCK" },
    ErrorDescriptor { index: 0x001c, name: "ERR HD-DRUCK" },
    ErrorDescriptor { index: 0x001d, name: "HD-SENSOR-MAX" },
    ErrorDescriptor { index: 0x001e, name: "HEISSGAS-MAX" },
    ErrorDescriptor { index: 0x001f, name: "ERR HD-SENSOR" },
    ErrorDescriptor { index: 0x0020, name: "EINFRIERSCHUTZ" },
    ErrorDescriptor { index: 0x0021, name: "KEINE LEISTUNG" },
];

/// Operating modes in the order the device numbers them.
///
/// Parsing walks this list front to back and takes the first name that prefixes the input, so a
/// name must never be listed after another name that is a prefix of it.
pub static OPERATING_MODES: &[OperatingModeDescriptor] = &[
    OperatingModeDescriptor { name: "Notbetrieb", index: 0x0000 },
    OperatingModeDescriptor { name: "Bereitschaft", index: 0x0100 },
    OperatingModeDescriptor { name: "Programmbetrieb", index: 0x0200 },
    OperatingModeDescriptor { name: "Komfortbetrieb", index: 0x0300 },
    OperatingModeDescriptor { name: "Eco-Betrieb", index: 0x0400 },
    OperatingModeDescriptor { name: "Warmwasserbetrieb", index: 0x0500 },
];

const _: () = {
    let mut position = 0;
    while position < OPERATING_MODES.len() {
        if OPERATING_MODES[position].index != (position as u16) << 8 {
            panic!("OPERATING_MODES index does not match its position!");
        }
        position += 1;
    }
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_catalog_index_resolves_to_its_slot() {
        let resolver = IndexResolver::build(REGISTERS);
        for (slot, descriptor) in REGISTERS.iter().enumerate() {
            assert_eq!(resolver.resolve(descriptor.index), Some(slot), "{}", descriptor.name);
        }
    }

    #[test]
    fn unknown_indices_do_not_resolve() {
        let resolver = IndexResolver::build(REGISTERS);
        let known = REGISTERS.iter().map(|r| r.index).collect::<std::collections::BTreeSet<_>>();
        for index in 0..=u16::MAX {
            if !known.contains(&index) {
                assert_eq!(resolver.resolve(index), None, "{index:#06x}");
            }
        }
    }

    #[test]
    fn duplicate_index_last_entry_wins() {
        let catalog = [
            RegisterDescriptor { name: "FIRST", index: 0x0042, value_type: ValueType::Byte },
            RegisterDescriptor { name: "OTHER", index: 0x0043, value_type: ValueType::Byte },
            RegisterDescriptor { name: "SECOND", index: 0x0042, value_type: ValueType::DecVal },
        ];
        let resolver = IndexResolver::build(&catalog);
        assert_eq!(resolver.resolve(0x0042), Some(2));
        assert_eq!(resolver.resolve(0x0043), Some(1));
        assert_eq!(resolver.resolve(0x0044), None);
    }

    #[test]
    fn register_handle_lookups() {
        let register = Register::from_index(0x0112).unwrap();
        assert_eq!(register.name(), "PROGRAMMSCHALTER");
        assert_eq!(register.value_type(), ValueType::Betriebsart);
        assert_eq!(Register::from_name("PROGRAMMSCHALTER"), Some(register));
        assert_eq!(Register::from_name("programmschalter"), None);
        assert_eq!(Register::from_index(0x0000), None);
        assert_eq!(Register::all().count(), REGISTERS.len());
    }

    #[test]
    fn value_type_names() {
        use strum::VariantArray as _;
        for vt in ValueType::VARIANTS {
            assert_eq!(ValueType::from_name(vt.name()), Some(*vt));
            assert!(vt.name().starts_with("et_"));
        }
        assert_eq!(ValueType::from_name("dec_val"), Some(ValueType::DecVal));
        assert_eq!(ValueType::from_name("et_little_bool"), Some(ValueType::LittleBool));
        assert_eq!(ValueType::from_name("et_nonsense"), None);
        assert_eq!(ValueType::Zeit.to_string(), "et_zeit");
    }

    #[test]
    fn side_tables() {
        assert_eq!(ErrorDescriptor::find(0x0004).map(|e| e.name), Some("Hochdruck"));
        assert_eq!(ErrorDescriptor::find(0x0001), None);
        assert_eq!(OperatingModeDescriptor::by_number(5).map(|m| m.name), Some("Warmwasserbetrieb"));
        assert_eq!(OperatingModeDescriptor::by_number(6), None);
    }
}

//! Built-in base modules: the SNMPv2-MIB system group and the IF-MIB
//! interfaces group, available before any MIB file is loaded.

use nq_protocol::{EntryKind, Oid, SchemaEntry};

struct BaseEntry {
    name: &'static str,
    arcs: &'static [u32],
    kind: EntryKind,
    syntax: &'static str,
    description: &'static str,
}

const fn node(name: &'static str, arcs: &'static [u32], description: &'static str) -> BaseEntry {
    BaseEntry {
        name,
        arcs,
        kind: EntryKind::ObjectIdentifier,
        syntax: "",
        description,
    }
}

const fn object(
    name: &'static str,
    arcs: &'static [u32],
    syntax: &'static str,
    description: &'static str,
) -> BaseEntry {
    BaseEntry {
        name,
        arcs,
        kind: EntryKind::ObjectType,
        syntax,
        description,
    }
}

static SNMPV2_MIB: &[BaseEntry] = &[
    node("system", &[1, 3, 6, 1, 2, 1, 1], "The system group."),
    object(
        "sysDescr",
        &[1, 3, 6, 1, 2, 1, 1, 1],
        "DisplayString (SIZE (0..255))",
        "A textual description of the entity. This value should include the full name and version identification of the system's hardware type, software operating-system, and networking software.",
    ),
    object(
        "sysObjectID",
        &[1, 3, 6, 1, 2, 1, 1, 2],
        "OBJECT IDENTIFIER",
        "The vendor's authoritative identification of the network management subsystem contained in the entity.",
    ),
    object(
        "sysUpTime",
        &[1, 3, 6, 1, 2, 1, 1, 3],
        "TimeTicks",
        "The time (in hundredths of a second) since the network management portion of the system was last re-initialized.",
    ),
    object(
        "sysContact",
        &[1, 3, 6, 1, 2, 1, 1, 4],
        "DisplayString (SIZE (0..255))",
        "The textual identification of the contact person for this managed node, together with information on how to contact this person.",
    ),
    object(
        "sysName",
        &[1, 3, 6, 1, 2, 1, 1, 5],
        "DisplayString (SIZE (0..255))",
        "An administratively-assigned name for this managed node. By convention, this is the node's fully-qualified domain name.",
    ),
    object(
        "sysLocation",
        &[1, 3, 6, 1, 2, 1, 1, 6],
        "DisplayString (SIZE (0..255))",
        "The physical location of this node (e.g., 'telephone closet, 3rd floor').",
    ),
    object(
        "sysServices",
        &[1, 3, 6, 1, 2, 1, 1, 7],
        "INTEGER (0..127)",
        "A value which indicates the set of services that this entity may potentially offer.",
    ),
];

static IF_MIB: &[BaseEntry] = &[
    node("interfaces", &[1, 3, 6, 1, 2, 1, 2], "The interfaces group."),
    object(
        "ifNumber",
        &[1, 3, 6, 1, 2, 1, 2, 1],
        "Integer32",
        "The number of network interfaces (regardless of their current state) present on this system.",
    ),
    object(
        "ifTable",
        &[1, 3, 6, 1, 2, 1, 2, 2],
        "SEQUENCE OF IfEntry",
        "A list of interface entries. The number of entries is given by the value of ifNumber.",
    ),
    object(
        "ifEntry",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1],
        "IfEntry",
        "An entry containing management information applicable to a particular interface.",
    ),
    object(
        "ifIndex",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 1],
        "InterfaceIndex",
        "A unique value, greater than zero, for each interface.",
    ),
    object(
        "ifDescr",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 2],
        "DisplayString (SIZE (0..255))",
        "A textual string containing information about the interface.",
    ),
    object(
        "ifType",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 3],
        "IANAifType",
        "The type of interface.",
    ),
    object(
        "ifMtu",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 4],
        "Integer32",
        "The size of the largest packet which can be sent/received on the interface, specified in octets.",
    ),
    object(
        "ifSpeed",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 5],
        "Gauge32",
        "An estimate of the interface's current bandwidth in bits per second.",
    ),
    object(
        "ifPhysAddress",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 6],
        "PhysAddress",
        "The interface's address at its protocol sub-layer.",
    ),
    object(
        "ifAdminStatus",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 7],
        "INTEGER { up(1), down(2), testing(3) }",
        "The desired state of the interface.",
    ),
    object(
        "ifOperStatus",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 8],
        "INTEGER { up(1), down(2), testing(3), unknown(4), dormant(5), notPresent(6), lowerLayerDown(7) }",
        "The current operational state of the interface.",
    ),
    object(
        "ifLastChange",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 9],
        "TimeTicks",
        "The value of sysUpTime at the time the interface entered its current operational state.",
    ),
    object(
        "ifInOctets",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 10],
        "Counter32",
        "The total number of octets received on the interface, including framing characters.",
    ),
    object(
        "ifInErrors",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 14],
        "Counter32",
        "The number of inbound packets that contained errors preventing them from being deliverable to a higher-layer protocol.",
    ),
    object(
        "ifOutOctets",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 16],
        "Counter32",
        "The total number of octets transmitted out of the interface, including framing characters.",
    ),
    object(
        "ifOutErrors",
        &[1, 3, 6, 1, 2, 1, 2, 2, 1, 20],
        "Counter32",
        "The number of outbound packets that could not be transmitted because of errors.",
    ),
];

/// Names of the built-in modules.
pub const BASE_MODULES: [&str; 2] = ["SNMPv2-MIB", "IF-MIB"];

fn table(module: &str) -> Option<&'static [BaseEntry]> {
    match module {
        "SNMPv2-MIB" => Some(SNMPV2_MIB),
        "IF-MIB" => Some(IF_MIB),
        _ => None,
    }
}

/// Entries of a built-in module, or None for any other name.
pub fn entries(module: &str) -> Option<Vec<SchemaEntry>> {
    let table = table(module)?;
    Some(
        table
            .iter()
            .map(|e| SchemaEntry {
                module: module.to_string(),
                name: e.name.to_string(),
                identifier: Oid::from_slice(e.arcs),
                description: e.description.to_string(),
                syntax: e.syntax.to_string(),
                kind: e.kind,
            })
            .collect(),
    )
}

//! `snmp2`-backed session.
//!
//! An `AsyncSession` is bound to one destination and community, so the
//! underlying socket is kept while consecutive checkouts talk to the same
//! device and rebuilt when the binding changes.

use async_trait::async_trait;
use nq_protocol::{Oid, RawResult, VarValue};
use snmp2::snmp::{
    ERRSTATUS_BADVALUE, ERRSTATUS_GENERR, ERRSTATUS_NOERROR, ERRSTATUS_NOSUCHNAME,
    ERRSTATUS_READONLY, ERRSTATUS_TOOBIG,
};
use snmp2::{AsyncSession, Pdu, Value};
use tracing::debug;

use crate::error::TransportError;
use crate::session::{SessionFactory, SnmpSession};
use crate::types::{PduRequest, SessionBinding, SnmpVersion};

/// Creates [`Snmp2Session`]s for the pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct Snmp2Connector;

impl SessionFactory for Snmp2Connector {
    fn create(&self) -> Box<dyn SnmpSession> {
        Box::new(Snmp2Session::default())
    }
}

#[derive(PartialEq, Eq)]
struct BoundKey {
    address: String,
    version: SnmpVersion,
    community: String,
}

/// Session over a UDP socket managed by `snmp2`.
#[derive(Default)]
pub struct Snmp2Session {
    bound: Option<(BoundKey, AsyncSession)>,
}

impl Snmp2Session {
    async fn session_for(
        &mut self,
        binding: &SessionBinding,
    ) -> Result<&mut AsyncSession, TransportError> {
        let key = BoundKey {
            address: binding.address(),
            version: binding.version,
            community: binding.community.clone(),
        };
        let reusable = matches!(&self.bound, Some((bound, _)) if *bound == key);
        if !reusable {
            debug!(device = %key.address, version = %key.version, "opening SNMP socket");
            let community = key.community.as_bytes();
            let session = match key.version {
                SnmpVersion::V1 => AsyncSession::new_v1(key.address.as_str(), community, 0).await,
                SnmpVersion::V2c => AsyncSession::new_v2c(key.address.as_str(), community, 0).await,
            }
            .map_err(|e| TransportError::Unreachable(e.to_string()))?;
            self.bound = Some((key, session));
        }
        match self.bound.as_mut() {
            Some((_, session)) => Ok(session),
            None => Err(TransportError::Unreachable("session not bound".into())),
        }
    }
}

#[async_trait]
impl SnmpSession for Snmp2Session {
    async fn exchange(
        &mut self,
        binding: &SessionBinding,
        request: &PduRequest,
    ) -> Result<Vec<RawResult>, TransportError> {
        let session = self.session_for(binding).await?;
        match request {
            PduRequest::Get(identifiers) => get_all(session, identifiers).await,
            PduRequest::GetNext(start) => {
                let oid = to_wire(start)?;
                let pdu = session.getnext(&oid).await.map_err(classify)?;
                successors(start, &pdu)
            }
            PduRequest::GetBulk {
                start,
                max_repetitions,
            } => {
                let oid = to_wire(start)?;
                let pdu = session
                    .getbulk(&[&oid], 0, *max_repetitions)
                    .await
                    .map_err(classify)?;
                successors(start, &pdu)
            }
        }
    }

    fn reset(&mut self) {
        self.bound = None;
    }
}

/// All identifiers in one GET PDU.
///
/// v1 agents fail the whole PDU with noSuchName and point at the offending
/// binding. That binding becomes `NoSuchObject` and the remaining ones are
/// asked for again.
async fn get_all(
    session: &mut AsyncSession,
    identifiers: &[Oid],
) -> Result<Vec<RawResult>, TransportError> {
    let mut missing = vec![false; identifiers.len()];
    loop {
        let pending: Vec<usize> = (0..identifiers.len()).filter(|&i| !missing[i]).collect();
        if pending.is_empty() {
            break;
        }
        let wire = pending
            .iter()
            .map(|&i| to_wire(&identifiers[i]))
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<&snmp2::Oid<'_>> = wire.iter().collect();
        let pdu = session.get_many(&refs).await.map_err(classify)?;

        match pdu.error_status {
            ERRSTATUS_NOERROR => {
                let found = decode(&pdu)?;
                if !missing.contains(&true) {
                    return Ok(found);
                }
                return Ok(merge(identifiers, &missing, found));
            }
            ERRSTATUS_NOSUCHNAME => {
                let index = (pdu.error_index as usize)
                    .checked_sub(1)
                    .and_then(|position| pending.get(position).copied())
                    .ok_or_else(|| agent_error(pdu.error_status, pdu.error_index))?;
                debug!(identifier = %identifiers[index], "agent reported noSuchName");
                missing[index] = true;
            }
            status => return Err(agent_error(status, pdu.error_index)),
        }
    }
    Ok(merge(identifiers, &missing, Vec::new()))
}

/// Interleave `NoSuchObject` placeholders with the bindings found.
fn merge(identifiers: &[Oid], missing: &[bool], found: Vec<RawResult>) -> Vec<RawResult> {
    let mut found = found.into_iter();
    let mut results = Vec::with_capacity(identifiers.len());
    for (identifier, &missing) in identifiers.iter().zip(missing) {
        if missing {
            results.push(RawResult::new(identifier.clone(), VarValue::NoSuchObject));
        } else if let Some(result) = found.next() {
            results.push(result);
        }
    }
    results.extend(found);
    results
}

/// GETNEXT/GETBULK reply. v1 agents signal the end of their view with noSuchName.
fn successors(start: &Oid, pdu: &Pdu<'_>) -> Result<Vec<RawResult>, TransportError> {
    match pdu.error_status {
        ERRSTATUS_NOERROR => decode(pdu),
        ERRSTATUS_NOSUCHNAME => Ok(vec![RawResult::new(
            start.clone(),
            VarValue::EndOfMibView,
        )]),
        status => Err(agent_error(status, pdu.error_index)),
    }
}

fn decode(pdu: &Pdu<'_>) -> Result<Vec<RawResult>, TransportError> {
    pdu.varbinds
        .clone()
        .map(|(oid, value)| from_wire(&oid, &value))
        .collect()
}

fn agent_error(status: u32, index: u32) -> TransportError {
    let name = match status {
        ERRSTATUS_TOOBIG => "tooBig",
        ERRSTATUS_NOSUCHNAME => "noSuchName",
        ERRSTATUS_BADVALUE => "badValue",
        ERRSTATUS_READONLY => "readOnly",
        ERRSTATUS_GENERR => "genErr",
        _ => "error",
    };
    TransportError::Malformed(format!("agent returned {name} ({status}) at index {index}"))
}

fn to_wire(oid: &Oid) -> Result<snmp2::Oid<'static>, TransportError> {
    let arcs: Vec<u64> = oid.arcs().iter().map(|&arc| u64::from(arc)).collect();
    snmp2::Oid::from(&arcs)
        .map_err(|e| TransportError::Malformed(format!("cannot encode {oid}: {e:?}")))
}

fn oid_from_wire(oid: &snmp2::Oid<'_>) -> Result<Oid, TransportError> {
    let dotted = oid.to_string();
    dotted
        .parse()
        .map_err(|_| TransportError::Malformed(format!("undecodable identifier '{dotted}'")))
}

fn from_wire(oid: &snmp2::Oid<'_>, value: &Value<'_>) -> Result<RawResult, TransportError> {
    let value = match value {
        Value::Integer(n) => VarValue::Integer(*n),
        Value::OctetString(bytes) | Value::Opaque(bytes) => VarValue::OctetString(bytes.to_vec()),
        Value::ObjectIdentifier(id) => VarValue::ObjectIdentifier(oid_from_wire(id)?),
        Value::IpAddress(octets) => VarValue::IpAddress(*octets),
        Value::Counter32(n) => VarValue::Counter32(*n),
        Value::Unsigned32(n) => VarValue::Gauge32(*n),
        Value::Timeticks(n) => VarValue::TimeTicks(*n),
        Value::Counter64(n) => VarValue::Counter64(*n),
        Value::Boolean(b) => VarValue::Integer(i64::from(*b)),
        Value::Null => VarValue::Null,
        Value::NoSuchObject => VarValue::NoSuchObject,
        Value::NoSuchInstance => VarValue::NoSuchInstance,
        Value::EndOfMibView => VarValue::EndOfMibView,
        other => {
            return Err(TransportError::Malformed(format!(
                "unexpected value in varbind: {other:?}"
            )));
        }
    };
    Ok(RawResult::new(oid_from_wire(oid)?, value))
}

/// Socket-level failures are retryable; decoding and protocol errors are not.
fn classify(err: snmp2::Error) -> TransportError {
    match &err {
        snmp2::Error::Send | snmp2::Error::Receive => TransportError::Unreachable(err.to_string()),
        _ => TransportError::Malformed(err.to_string()),
    }
}

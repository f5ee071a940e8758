//! Geo family: GEOADD, GEOPOS, GEODIST, GEORADIUS,
//! GEORADIUSBYMEMBER. Member removal reuses `ZREM` on the same key (a geo
//! set is a sorted set keyed by geohash) — see
//! [`crate::commands::zset::SortedSetCommands::zrem`].

use std::marker::PhantomData;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::{build, bulk_as_f64, expect_array, expect_bulk, expect_integer, validate_non_empty};
use crate::error::{RedisError, RedisResult};
use crate::executor::{CommandKind, Executor};
use crate::protocol::RedisData;
use crate::transcode::OpaqueTranscoder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Order {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GeoEntry<T> {
    pub member: T,
    pub distance: Option<f64>,
    pub coordinates: Option<(f64, f64)>,
}

pub struct GeoCommands<T> {
    executor: Arc<Executor>,
    transcoder: OpaqueTranscoder,
    _marker: PhantomData<fn() -> T>,
}

impl<T: Serialize + DeserializeOwned> GeoCommands<T> {
    pub fn new(executor: Arc<Executor>) -> Self {
        let threshold = executor.config().compression_threshold;
        Self {
            executor,
            transcoder: OpaqueTranscoder::new(threshold),
            _marker: PhantomData,
        }
    }

    fn encode(&self, value: &T) -> RedisResult<Vec<u8>> {
        Ok(self.transcoder.encode(value)?.0.to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> RedisResult<T> {
        self.transcoder.decode(bytes)
    }

    /// Elides a zero-length `entries` input with a short-circuit return of
    /// `0`.
    pub async fn geoadd(&self, key: &[u8], entries: &[(T, f64, f64)]) -> RedisResult<i64> {
        validate_non_empty("key", key)?;
        if entries.is_empty() {
            return Ok(0);
        }
        let mut args = vec![b"GEOADD".to_vec(), key.to_vec()];
        for (member, longitude, latitude) in entries {
            args.push(format!("{longitude}").into_bytes());
            args.push(format!("{latitude}").into_bytes());
            args.push(self.encode(member)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute("geoadd", key, CommandKind::Write, payload).await?;
        expect_integer(frame)
    }

    pub async fn geopos(&self, key: &[u8], members: &[T]) -> RedisResult<Vec<Option<(f64, f64)>>> {
        validate_non_empty("key", key)?;
        if members.is_empty() {
            return Ok(Vec::new());
        }
        let mut args = vec![b"GEOPOS".to_vec(), key.to_vec()];
        for m in members {
            args.push(self.encode(m)?);
        }
        let payload = build(&args);
        let frame = self.executor.execute("geopos", key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        items.into_iter().map(parse_optional_coordinate).collect()
    }

    pub async fn geodist(&self, key: &[u8], member1: &T, member2: &T, unit: Option<&str>) -> RedisResult<Option<f64>> {
        validate_non_empty("key", key)?;
        let mut args = vec![b"GEODIST".to_vec(), key.to_vec(), self.encode(member1)?, self.encode(member2)?];
        if let Some(unit) = unit {
            args.push(unit.as_bytes().to_vec());
        }
        let payload = build(&args);
        let frame = self.executor.execute("geodist", key, CommandKind::Read, payload).await?;
        match expect_bulk(frame)? {
            Some(bytes) => Ok(Some(bulk_as_f64(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn georadius_inner(
        &self,
        method: &'static str,
        args: Vec<Vec<u8>>,
        key: &[u8],
        with_coord: bool,
        with_dist: bool,
    ) -> RedisResult<Vec<GeoEntry<T>>> {
        let payload = build(&args);
        let frame = self.executor.execute(method, key, CommandKind::Read, payload).await?;
        let items = expect_array(frame)?.unwrap_or_default();
        items
            .into_iter()
            .map(|item| self.parse_geo_entry(item, with_coord, with_dist))
            .collect()
    }

    fn parse_geo_entry(&self, item: RedisData, with_coord: bool, with_dist: bool) -> RedisResult<GeoEntry<T>> {
        if !with_coord && !with_dist {
            let bytes = expect_bulk(item)?
                .ok_or_else(|| RedisError::UnexpectedError("nil member in GEORADIUS reply".into()))?;
            return Ok(GeoEntry {
                member: self.decode(&bytes)?,
                distance: None,
                coordinates: None,
            });
        }
        let mut fields = expect_array(item)?
            .ok_or_else(|| RedisError::UnexpectedError("expected per-member array in GEORADIUS reply".into()))?
            .into_iter();
        let member_bytes = expect_bulk(
            fields
                .next()
                .ok_or_else(|| RedisError::UnexpectedError("empty GEORADIUS entry".into()))?,
        )?
        .ok_or_else(|| RedisError::UnexpectedError("nil member in GEORADIUS reply".into()))?;
        let member = self.decode(&member_bytes)?;

        let distance = if with_dist {
            let bytes = expect_bulk(
                fields
                    .next()
                    .ok_or_else(|| RedisError::UnexpectedError("missing distance in GEORADIUS reply".into()))?,
            )?
            .ok_or_else(|| RedisError::UnexpectedError("nil distance in GEORADIUS reply".into()))?;
            Some(bulk_as_f64(&bytes)?)
        } else {
            None
        };

        let coordinates = if with_coord {
            Some(parse_coordinate(
                fields
                    .next()
                    .ok_or_else(|| RedisError::UnexpectedError("missing coordinate in GEORADIUS reply".into()))?,
            )?)
        } else {
            None
        };

        Ok(GeoEntry {
            member,
            distance,
            coordinates,
        })
    }

    /// `GEORADIUS key longitude latitude radius unit [WITHCOORD]
    /// [WITHDIST] [COUNT n] [ASC|DESC]`.
    #[allow(clippy::too_many_arguments)]
    pub async fn georadius(
        &self,
        key: &[u8],
        longitude: f64,
        latitude: f64,
        radius: f64,
        unit: &str,
        with_coord: bool,
        with_dist: bool,
        count: Option<i64>,
        order: Option<Order>,
    ) -> RedisResult<Vec<GeoEntry<T>>> {
        validate_non_empty("key", key)?;
        let mut args = vec![
            b"GEORADIUS".to_vec(),
            key.to_vec(),
            format!("{longitude}").into_bytes(),
            format!("{latitude}").into_bytes(),
            format!("{radius}").into_bytes(),
            unit.as_bytes().to_vec(),
        ];
        push_radius_modifiers(&mut args, with_coord, with_dist, count, order);
        self.georadius_inner("georadius", args, key, with_coord, with_dist).await
    }

    /// `GEORADIUSBYMEMBER key member radius unit [WITHCOORD] [WITHDIST]
    /// [COUNT n] [ASC|DESC]`.
    pub async fn georadiusbymember(
        &self,
        key: &[u8],
        member: &T,
        radius: f64,
        unit: &str,
        with_coord: bool,
        with_dist: bool,
        count: Option<i64>,
        order: Option<Order>,
    ) -> RedisResult<Vec<GeoEntry<T>>> {
        validate_non_empty("key", key)?;
        let mut args = vec![
            b"GEORADIUSBYMEMBER".to_vec(),
            key.to_vec(),
            self.encode(member)?,
            format!("{radius}").into_bytes(),
            unit.as_bytes().to_vec(),
        ];
        push_radius_modifiers(&mut args, with_coord, with_dist, count, order);
        self.georadius_inner("georadiusbymember", args, key, with_coord, with_dist)
            .await
    }
}

fn push_radius_modifiers(args: &mut Vec<Vec<u8>>, with_coord: bool, with_dist: bool, count: Option<i64>, order: Option<Order>) {
    if with_coord {
        args.push(b"WITHCOORD".to_vec());
    }
    if with_dist {
        args.push(b"WITHDIST".to_vec());
    }
    if let Some(n) = count {
        args.push(b"COUNT".to_vec());
        args.push(n.to_string().into_bytes());
    }
    match order {
        Some(Order::Asc) => args.push(b"ASC".to_vec()),
        Some(Order::Desc) => args.push(b"DESC".to_vec()),
        None => {}
    }
}

fn parse_coordinate(item: RedisData) -> RedisResult<(f64, f64)> {
    let mut pair = expect_array(item)?
        .ok_or_else(|| RedisError::UnexpectedError("nil coordinate pair".into()))?
        .into_iter();
    let lon = expect_bulk(pair.next().ok_or_else(|| RedisError::UnexpectedError("missing longitude".into()))?)?
        .ok_or_else(|| RedisError::UnexpectedError("nil longitude".into()))?;
    let lat = expect_bulk(pair.next().ok_or_else(|| RedisError::UnexpectedError("missing latitude".into()))?)?
        .ok_or_else(|| RedisError::UnexpectedError("nil latitude".into()))?;
    Ok((bulk_as_f64(&lon)?, bulk_as_f64(&lat)?))
}

fn parse_optional_coordinate(item: RedisData) -> RedisResult<Option<(f64, f64)>> {
    match item {
        RedisData::Array(None) => Ok(None),
        other => parse_coordinate(other).map(Some),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radius_modifiers_in_order() {
        let mut args = Vec::new();
        push_radius_modifiers(&mut args, true, true, Some(5), Some(Order::Asc));
        let flat: Vec<String> = args.iter().map(|a| String::from_utf8_lossy(a).to_string()).collect();
        assert_eq!(flat, vec!["WITHCOORD", "WITHDIST", "COUNT", "5", "ASC"]);
    }
}

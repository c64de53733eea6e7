use serde_json::{Map, Value, json};
use tracing::info;

use crate::error::DeployError;
use crate::topology::{CertificateValidation, SubnetKind, SubnetPlan, Topology};

const CONTAINER_NAME: &str = "AppContainer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Json,
    Yaml,
}

impl std::str::FromStr for TemplateFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(TemplateFormat::Json),
            "yaml" | "yml" => Ok(TemplateFormat::Yaml),
            other => Err(format!("unknown format {other:?}, expected json or yaml")),
        }
    }
}

fn reference(logical_id: &str) -> Value {
    json!({ "Ref": logical_id })
}

fn attribute(logical_id: &str, name: &str) -> Value {
    json!({ "Fn::GetAtt": [logical_id, name] })
}

fn tagged(name: String) -> Value {
    json!([{ "Key": "Name", "Value": name }])
}

/// Validates the topology and turns it into a CloudFormation template.
pub fn render_cloudformation(topology: &Topology) -> Result<Value, DeployError> {
    topology.validate()?;
    let plan = topology
        .subnet_plan()
        .ok_or_else(|| DeployError::Invalid(vec!["subnets do not fit in the VPC".into()]))?;

    let mut resources = Map::new();
    network_resources(topology, &plan, &mut resources);
    edge_resources(topology, &plan, &mut resources);
    service_resources(topology, &plan, &mut resources);

    info!(
        stack = %topology.stack.name,
        resources = resources.len(),
        "cloudformation template rendered"
    );

    Ok(json!({
        "AWSTemplateFormatVersion": "2010-09-09",
        "Description": format!("{} account service", topology.stack.name),
        "Resources": resources,
        "Outputs": {
            "LoadBalancerDNS": {
                "Value": attribute("AppLB", "DNSName"),
            },
        },
    }))
}

pub fn render(topology: &Topology, format: TemplateFormat) -> Result<String, DeployError> {
    let template = render_cloudformation(topology)?;
    Ok(match format {
        TemplateFormat::Json => serde_json::to_string_pretty(&template)?,
        TemplateFormat::Yaml => serde_yaml::to_string(&template)?,
    })
}

fn subnet_ids(plan: &[SubnetPlan], kind: SubnetKind) -> Vec<Value> {
    plan.iter()
        .filter(|s| s.kind == kind)
        .map(|s| reference(&s.logical_id))
        .collect()
}

fn network_resources(topology: &Topology, plan: &[SubnetPlan], out: &mut Map<String, Value>) {
    let stack = &topology.stack.name;
    out.insert(
        "AppVPC".into(),
        json!({
            "Type": "AWS::EC2::VPC",
            "Properties": {
                "CidrBlock": topology.network.cidr,
                "EnableDnsHostnames": true,
                "EnableDnsSupport": true,
                "Tags": tagged(format!("{stack}/AppVPC")),
            },
        }),
    );
    out.insert(
        "AppIGW".into(),
        json!({ "Type": "AWS::EC2::InternetGateway" }),
    );
    out.insert(
        "AppIGWAttachment".into(),
        json!({
            "Type": "AWS::EC2::VPCGatewayAttachment",
            "Properties": {
                "VpcId": reference("AppVPC"),
                "InternetGatewayId": reference("AppIGW"),
            },
        }),
    );

    let public: Vec<&SubnetPlan> = plan.iter().filter(|s| s.kind == SubnetKind::Public).collect();
    let nat_count = usize::from(topology.network.nat_gateways).min(public.len());
    for (i, subnet) in public.iter().take(nat_count).enumerate() {
        out.insert(
            format!("AppNatEIP{}", i + 1),
            json!({
                "Type": "AWS::EC2::EIP",
                "Properties": { "Domain": "vpc" },
                "DependsOn": "AppIGWAttachment",
            }),
        );
        out.insert(
            format!("AppNat{}", i + 1),
            json!({
                "Type": "AWS::EC2::NatGateway",
                "Properties": {
                    "SubnetId": reference(&subnet.logical_id),
                    "AllocationId": attribute(&format!("AppNatEIP{}", i + 1), "AllocationId"),
                },
            }),
        );
    }

    for subnet in plan {
        let id = &subnet.logical_id;
        let public_subnet = subnet.kind == SubnetKind::Public;
        out.insert(
            id.clone(),
            json!({
                "Type": "AWS::EC2::Subnet",
                "Properties": {
                    "VpcId": reference("AppVPC"),
                    "CidrBlock": subnet.cidr,
                    "AvailabilityZone": { "Fn::Select": [subnet.az_index, { "Fn::GetAZs": "" }] },
                    "MapPublicIpOnLaunch": public_subnet,
                    "Tags": tagged(format!("{stack}/AppVPC/{id}")),
                },
            }),
        );

        let route = if public_subnet {
            json!({ "GatewayId": reference("AppIGW") })
        } else {
            let nat = usize::from(subnet.az_index) % nat_count.max(1) + 1;
            json!({ "NatGatewayId": reference(&format!("AppNat{nat}")) })
        };
        let mut route_props = Map::new();
        route_props.insert("RouteTableId".into(), reference(&format!("{id}RouteTable")));
        route_props.insert("DestinationCidrBlock".into(), json!("0.0.0.0/0"));
        if let Value::Object(target) = route {
            route_props.extend(target);
        }

        out.insert(
            format!("{id}RouteTable"),
            json!({
                "Type": "AWS::EC2::RouteTable",
                "Properties": { "VpcId": reference("AppVPC") },
            }),
        );
        out.insert(
            format!("{id}DefaultRoute"),
            json!({ "Type": "AWS::EC2::Route", "Properties": route_props }),
        );
        out.insert(
            format!("{id}RouteTableAssociation"),
            json!({
                "Type": "AWS::EC2::SubnetRouteTableAssociation",
                "Properties": {
                    "RouteTableId": reference(&format!("{id}RouteTable")),
                    "SubnetId": reference(id),
                },
            }),
        );
    }
}

fn edge_resources(topology: &Topology, plan: &[SubnetPlan], out: &mut Map<String, Value>) {
    let lb = &topology.load_balancer;
    let health = &topology.service.health_check;
    let port = lb.listener_port;

    out.insert(
        "AppLBSecurityGroup".into(),
        json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": {
                "GroupDescription": "Load balancer ingress",
                "VpcId": reference("AppVPC"),
                "SecurityGroupIngress": [{
                    "IpProtocol": "tcp",
                    "FromPort": port,
                    "ToPort": port,
                    "CidrIp": "0.0.0.0/0",
                }],
            },
        }),
    );
    out.insert(
        "AppLB".into(),
        json!({
            "Type": "AWS::ElasticLoadBalancingV2::LoadBalancer",
            "Properties": {
                "Type": "application",
                "Scheme": if lb.internet_facing { "internet-facing" } else { "internal" },
                "Subnets": subnet_ids(plan, SubnetKind::Public),
                "SecurityGroups": [attribute("AppLBSecurityGroup", "GroupId")],
            },
            "DependsOn": "AppIGWAttachment",
        }),
    );
    out.insert(
        "AppCert".into(),
        json!({
            "Type": "AWS::CertificateManager::Certificate",
            "Properties": {
                "DomainName": lb.certificate.domain_name,
                "ValidationMethod": match lb.certificate.validation {
                    CertificateValidation::Dns => "DNS",
                    CertificateValidation::Email => "EMAIL",
                },
            },
        }),
    );
    out.insert(
        "AppTG".into(),
        json!({
            "Type": "AWS::ElasticLoadBalancingV2::TargetGroup",
            "Properties": {
                "VpcId": reference("AppVPC"),
                "Port": topology.service.container_port,
                "Protocol": "HTTP",
                "TargetType": "ip",
                "HealthCheckPath": health.path,
                "HealthCheckIntervalSeconds": health.interval_secs,
                "HealthCheckTimeoutSeconds": health.timeout_secs,
            },
        }),
    );
    out.insert(
        "HttpsListener".into(),
        json!({
            "Type": "AWS::ElasticLoadBalancingV2::Listener",
            "Properties": {
                "LoadBalancerArn": reference("AppLB"),
                "Port": port,
                "Protocol": "HTTPS",
                "Certificates": [{ "CertificateArn": reference("AppCert") }],
                "DefaultActions": [{ "Type": "forward", "TargetGroupArn": reference("AppTG") }],
            },
        }),
    );

    let dns = &topology.dns;
    out.insert(
        "AppDNS".into(),
        json!({
            "Type": "AWS::Route53::RecordSet",
            "Properties": {
                "HostedZoneName": format!("{}.", dns.zone_domain.trim_end_matches('.')),
                "Name": format!("{}.", dns.record_name.trim_end_matches('.')),
                "Type": "A",
                "AliasTarget": {
                    "DNSName": attribute("AppLB", "DNSName"),
                    "HostedZoneId": attribute("AppLB", "CanonicalHostedZoneID"),
                },
            },
        }),
    );
}

fn service_resources(topology: &Topology, plan: &[SubnetPlan], out: &mut Map<String, Value>) {
    let service = &topology.service;
    let port = service.container_port;

    out.insert(
        "AppCluster".into(),
        json!({
            "Type": "AWS::ECS::Cluster",
            "Properties": {
                "ClusterSettings": [{
                    "Name": "containerInsights",
                    "Value": if topology.cluster.container_insights { "enabled" } else { "disabled" },
                }],
            },
        }),
    );
    out.insert(
        "AppServiceSG".into(),
        json!({
            "Type": "AWS::EC2::SecurityGroup",
            "Properties": {
                "GroupDescription": "Security group for App Fargate Service",
                "VpcId": reference("AppVPC"),
                "SecurityGroupEgress": [{ "IpProtocol": "-1", "CidrIp": "0.0.0.0/0" }],
                "SecurityGroupIngress": [{
                    "IpProtocol": "tcp",
                    "FromPort": port,
                    "ToPort": port,
                    "SourceSecurityGroupId": attribute("AppLBSecurityGroup", "GroupId"),
                }],
            },
        }),
    );
    out.insert(
        "AppLogGroup".into(),
        json!({
            "Type": "AWS::Logs::LogGroup",
            "Properties": { "RetentionInDays": 30 },
        }),
    );

    let secret_arns: Vec<Value> = service
        .secrets
        .values()
        .map(|name| secret_arn_pattern(name))
        .collect();
    out.insert(
        "AppTaskExecutionRole".into(),
        json!({
            "Type": "AWS::IAM::Role",
            "Properties": {
                "AssumeRolePolicyDocument": {
                    "Version": "2012-10-17",
                    "Statement": [{
                        "Effect": "Allow",
                        "Principal": { "Service": "ecs-tasks.amazonaws.com" },
                        "Action": "sts:AssumeRole",
                    }],
                },
                "ManagedPolicyArns": [
                    { "Fn::Sub": "arn:${AWS::Partition}:iam::aws:policy/service-role/AmazonECSTaskExecutionRolePolicy" },
                ],
                "Policies": [{
                    "PolicyName": "ReadServiceSecrets",
                    "PolicyDocument": {
                        "Version": "2012-10-17",
                        "Statement": [{
                            "Effect": "Allow",
                            "Action": ["secretsmanager:GetSecretValue"],
                            "Resource": secret_arns,
                        }],
                    },
                }],
            },
        }),
    );

    let environment: Vec<Value> = service
        .environment
        .iter()
        .map(|(name, value)| json!({ "Name": name, "Value": value }))
        .collect();
    let secrets: Vec<Value> = service
        .secrets
        .iter()
        .map(|(name, secret)| json!({ "Name": name, "ValueFrom": secret }))
        .collect();

    out.insert(
        "AppTask".into(),
        json!({
            "Type": "AWS::ECS::TaskDefinition",
            "Properties": {
                "Cpu": service.cpu.to_string(),
                "Memory": service.memory_mib.to_string(),
                "NetworkMode": "awsvpc",
                "RequiresCompatibilities": ["FARGATE"],
                "ExecutionRoleArn": attribute("AppTaskExecutionRole", "Arn"),
                "ContainerDefinitions": [{
                    "Name": CONTAINER_NAME,
                    "Image": service.image,
                    "Essential": true,
                    "PortMappings": [{ "ContainerPort": port, "Protocol": "tcp" }],
                    "Environment": environment,
                    "Secrets": secrets,
                    "LogConfiguration": {
                        "LogDriver": "awslogs",
                        "Options": {
                            "awslogs-group": reference("AppLogGroup"),
                            "awslogs-region": reference("AWS::Region"),
                            "awslogs-stream-prefix": service.log_stream_prefix,
                        },
                    },
                }],
            },
        }),
    );
    out.insert(
        "AppService".into(),
        json!({
            "Type": "AWS::ECS::Service",
            "DependsOn": "HttpsListener",
            "Properties": {
                "Cluster": reference("AppCluster"),
                "TaskDefinition": reference("AppTask"),
                "LaunchType": "FARGATE",
                "DesiredCount": service.desired_count,
                "NetworkConfiguration": {
                    "AwsvpcConfiguration": {
                        "AssignPublicIp": if service.assign_public_ip { "ENABLED" } else { "DISABLED" },
                        "Subnets": subnet_ids(plan, SubnetKind::Private),
                        "SecurityGroups": [attribute("AppServiceSG", "GroupId")],
                    },
                },
                "LoadBalancers": [{
                    "ContainerName": CONTAINER_NAME,
                    "ContainerPort": port,
                    "TargetGroupArn": reference("AppTG"),
                }],
            },
        }),
    );
}

/// Secrets Manager appends a random six-character suffix to every secret ARN.
fn secret_arn_pattern(name: &str) -> Value {
    json!({
        "Fn::Sub": format!(
            "arn:${{AWS::Partition}}:secretsmanager:${{AWS::Region}}:${{AWS::AccountId}}:secret:{name}-??????"
        )
    })
}
